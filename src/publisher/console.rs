use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{publisher::Registration, weather::Conditions};

use super::{ConditionsEvent, Publisher, PublisherConfig, PublisherResult};

struct Console {
    compact: bool,
}

impl Console {
    fn render(&self, conditions: &Conditions) -> serde_json::Result<String> {
        let event = ConditionsEvent::from(conditions);

        if self.compact {
            serde_json::to_string(&event)
        } else {
            serde_json::to_string_pretty(&event)
        }
    }
}

#[async_trait]
impl Publisher for Console {
    async fn publish(&self, conditions: &Conditions) -> PublisherResult<()> {
        println!("{}", self.render(conditions)?);
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct Config {
    compact: Option<bool>,
}

impl PublisherConfig for Config {
    fn build(self) -> PublisherResult<Box<dyn Publisher>> {
        Ok(Box::new(Console {
            compact: self.compact.unwrap_or(false),
        }))
    }
}

inventory::submit! {
    Registration::new::<Config>("console")
}
