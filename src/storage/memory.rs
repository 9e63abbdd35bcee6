use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    storage::Registration,
    weather::{CityWeatherCondition, Conditions},
};

use super::{Storage, StorageConfig, StorageResult};

/// Process local storage, lost on restart.
#[derive(Default)]
struct Memory {
    conditions: RwLock<BTreeMap<String, CityWeatherCondition>>,
}

#[async_trait]
impl Storage for Memory {
    async fn save_conditions(&self, conditions: &Conditions) -> StorageResult<()> {
        let mut stored = self.conditions.write().await;

        for condition in conditions.iter() {
            stored.insert(condition.city.name.clone(), condition.clone());
        }

        Ok(())
    }

    async fn get_conditions(&self) -> StorageResult<Conditions> {
        Ok(self.conditions.read().await.values().cloned().collect())
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct Config {}

impl StorageConfig for Config {
    fn build(self) -> StorageResult<Box<dyn Storage>> {
        Ok(Box::new(Memory::default()))
    }
}

inventory::submit! {
    Registration::new::<Config>("memory")
}
