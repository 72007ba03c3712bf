#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use carbench::error::Result;
use carbench::generation::TextGenerator;
use std::sync::Mutex;

pub const CARS_CSV: &str = "\
Make,Model,Year,Engine Fuel Type,Engine HP,Engine Cylinders,Transmission Type,Driven_Wheels,Number of Doors,Market Category,Vehicle Size,Vehicle Style,highway MPG,city mpg,Popularity,MSRP
Toyota,86,2017,premium unleaded (required),205.0,4.0,MANUAL,rear wheel drive,2.0,Performance,Compact,Coupe,30,21,2031,26255
BMW,1 Series M,2011,premium unleaded (required),335.0,6.0,MANUAL,rear wheel drive,2.0,\"Factory Tuner,Luxury,High-Performance\",Compact,Coupe,26,19,3916,46135
Honda,Civic,2016,regular unleaded,158.0,4.0,AUTOMATIC,front wheel drive,4.0,N/A,Compact,Sedan,41,31,2202,18640
Ford,F-150,2017,flex-fuel (unleaded/E85),282.0,6.0,AUTOMATIC,four wheel drive,4.0,Flex Fuel,Large,Crew Cab Pickup,23,17,5657,40990
Tesla,Model S,2016,electric,,0.0,DIRECT_DRIVE,all wheel drive,4.0,\"Exotic,Performance\",Large,Sedan,100,94,1391,79500
";

pub const TOYOTA_86_ONLY_CSV: &str = "\
Make,Model,Year,Engine Fuel Type,Engine HP,Engine Cylinders,Transmission Type,Driven_Wheels,Number of Doors,Market Category,Vehicle Size,Vehicle Style,highway MPG,city mpg,Popularity,MSRP
Toyota,86,2017,premium unleaded (required),205.0,4.0,MANUAL,rear wheel drive,2.0,Performance,Compact,Coupe,30,21,2031,26255
";

/// Generator that returns a fixed answer and records the prompts it saw.
pub struct FixedGenerator {
    pub answer: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FixedGenerator {
    pub fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    fn backend_name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }
}
