use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    collector,
    publisher::Publisher,
    source::{BoxError, WeatherSource},
    storage::Storage,
    topology::Component,
    weather::{City, Conditions, MonitoringParams},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("collection failed: {0}")]
    Collect(#[source] collector::Error),

    #[error("storage {1} failed: {0}")]
    Storage(#[source] BoxError, String),

    #[error("publisher {1} failed: {0}")]
    Publish(#[source] BoxError, String),
}

pub struct WeatherService {
    pub cities: Vec<City>,

    pub params: Arc<MonitoringParams>,

    pub worker_pool_size: usize,

    /// Once elapsed, a collection run stops starting new fetches.
    pub collect_timeout: Option<Duration>,

    pub source: Component<dyn WeatherSource>,

    pub storage: Component<dyn Storage>,

    pub publishers: Vec<Component<dyn Publisher>>,
}

impl WeatherService {
    pub async fn init(&self) -> Result<(), Error> {
        self.storage
            .component
            .init()
            .await
            .map_err(|e| Error::Storage(e, self.storage.name.clone()))
    }

    /// Fetches the current weather of every configured city and stores the
    /// conditions that could be collected.
    pub async fn collect_data(&self, cancel: CancellationToken) -> Result<usize, Error> {
        let start = Instant::now();
        let run = cancel.child_token();

        let deadline = self.collect_timeout.map(|timeout| {
            let run = run.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!(?timeout, "collection timed out, no new fetches will be started");
                run.cancel();
            })
        });

        let source = self.source.component.clone();
        let fetch = move |city: City, params: Arc<MonitoringParams>| {
            let source = source.clone();
            async move { source.current_weather(&city, &params).await }
        };

        let collected = collector::collect(
            self.cities.clone(),
            self.params.clone(),
            self.worker_pool_size,
            fetch,
            run,
        )
        .await;

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        let conditions = Conditions::from(collected.map_err(Error::Collect)?);

        self.storage
            .component
            .save_conditions(&conditions)
            .await
            .map_err(|e| Error::Storage(e, self.storage.name.clone()))?;

        info!(
            source = %self.source.name,
            saved = conditions.len(),
            cities = self.cities.len(),
            elapsed = ?start.elapsed(),
            "successfully saved reported cities"
        );

        Ok(conditions.len())
    }

    /// Publishes the stored conditions to every publisher.
    ///
    /// Every publisher is attempted; the first failure is returned.
    pub async fn send_data(&self) -> Result<(), Error> {
        let conditions = self
            .storage
            .component
            .get_conditions()
            .await
            .map_err(|e| Error::Storage(e, self.storage.name.clone()))?;

        if conditions.is_empty() {
            warn!("no stored conditions, skipping publishing");
            return Ok(());
        }

        let mut first_error = None;

        for publisher in &self.publishers {
            let start = Instant::now();

            match publisher.component.publish(&conditions).await {
                Ok(()) => info!(
                    publisher = %publisher.name,
                    conditions = conditions.len(),
                    elapsed = ?start.elapsed(),
                    "weather conditions published"
                ),
                Err(e) => {
                    error!(publisher = %publisher.name, error = %e, "error publishing conditions");
                    first_error.get_or_insert(Error::Publish(e, publisher.name.clone()));
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::{
        publisher::PublisherResult,
        source::SourceResult,
        storage::StorageResult,
        testing,
        weather::CityWeatherCondition,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    pub struct FakeSource {
        pub failing: Vec<&'static str>,

        pub delay: Duration,
    }

    #[async_trait]
    impl WeatherSource for FakeSource {
        async fn current_weather(
            &self,
            city: &City,
            _params: &MonitoringParams,
        ) -> SourceResult<CityWeatherCondition> {
            tokio::time::sleep(self.delay).await;

            if self.failing.contains(&city.name.as_str()) {
                return Err("client error".into());
            }

            Ok(testing::condition_for(city))
        }
    }

    #[derive(Default)]
    pub struct FakeStorage {
        pub saved: Mutex<Vec<Conditions>>,

        pub stored: Conditions,

        pub fail: bool,
    }

    #[async_trait]
    impl Storage for FakeStorage {
        async fn save_conditions(&self, conditions: &Conditions) -> StorageResult<()> {
            self.saved.lock().unwrap().push(conditions.clone());

            if self.fail {
                return Err("storage error".into());
            }

            Ok(())
        }

        async fn get_conditions(&self) -> StorageResult<Conditions> {
            if self.fail {
                return Err("storage error".into());
            }

            Ok(self.stored.clone())
        }
    }

    #[derive(Default)]
    pub struct FakePublisher {
        pub published: Mutex<Vec<Conditions>>,

        pub fail: bool,
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(&self, conditions: &Conditions) -> PublisherResult<()> {
            self.published.lock().unwrap().push(conditions.clone());

            if self.fail {
                return Err("broker unavailable".into());
            }

            Ok(())
        }
    }

    pub fn service(
        source: FakeSource,
        storage: Arc<FakeStorage>,
        publishers: Vec<Arc<FakePublisher>>,
    ) -> WeatherService {
        WeatherService {
            cities: testing::cities(),
            params: Arc::new(testing::params()),
            worker_pool_size: 3,
            collect_timeout: None,
            source: Component::new("fake", Arc::new(source) as Arc<dyn WeatherSource>),
            storage: Component::new("fake", storage as Arc<dyn Storage>),
            publishers: publishers
                .into_iter()
                .enumerate()
                .map(|(i, p)| Component::new(format!("fake-{i}"), p as Arc<dyn Publisher>))
                .collect(),
        }
    }

    fn source(failing: Vec<&'static str>) -> FakeSource {
        FakeSource {
            failing,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_collect_saves_all_conditions() {
        let storage = Arc::new(FakeStorage::default());
        let service = service(source(vec![]), storage.clone(), vec![]);

        let saved = service.collect_data(CancellationToken::new()).await.unwrap();

        assert_eq!(saved, 3);
        let batches = storage.saved.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].clone().sorted_by_city(),
            Conditions::from(vec![testing::berlin(), testing::london(), testing::paris()])
        );
    }

    #[tokio::test]
    async fn test_collect_skips_failed_city() {
        let storage = Arc::new(FakeStorage::default());
        let service = service(source(vec!["London"]), storage.clone(), vec![]);

        let saved = service.collect_data(CancellationToken::new()).await.unwrap();

        assert_eq!(saved, 2);
        assert_eq!(
            storage.saved.lock().unwrap()[0].clone().sorted_by_city(),
            Conditions::from(vec![testing::berlin(), testing::paris()])
        );
    }

    #[tokio::test]
    async fn test_collect_storage_error() {
        let storage = Arc::new(FakeStorage {
            fail: true,
            ..Default::default()
        });
        let service = service(source(vec![]), storage.clone(), vec![]);

        let result = service.collect_data(CancellationToken::new()).await;

        assert!(matches!(result, Err(Error::Storage(_, name)) if name == "fake"));
        assert_eq!(storage.saved.lock().unwrap()[0].len(), 3);
    }

    #[tokio::test]
    async fn test_collect_timeout_stops_new_fetches() {
        let storage = Arc::new(FakeStorage::default());
        let mut service = service(
            FakeSource {
                failing: vec![],
                delay: Duration::from_millis(50),
            },
            storage.clone(),
            vec![],
        );
        service.worker_pool_size = 1;
        service.collect_timeout = Some(Duration::from_millis(10));

        let saved = service.collect_data(CancellationToken::new()).await.unwrap();

        assert_eq!(saved, 1);
    }

    #[tokio::test]
    async fn test_send_publishes_stored_conditions() {
        let stored = Conditions::from(vec![testing::berlin(), testing::paris()]);
        let storage = Arc::new(FakeStorage {
            stored: stored.clone(),
            ..Default::default()
        });
        let publisher = Arc::new(FakePublisher::default());
        let service = service(source(vec![]), storage, vec![publisher.clone()]);

        service.send_data().await.unwrap();

        assert_eq!(*publisher.published.lock().unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn test_send_skips_empty_storage() {
        let publisher = Arc::new(FakePublisher::default());
        let service = service(
            source(vec![]),
            Arc::new(FakeStorage::default()),
            vec![publisher.clone()],
        );

        service.send_data().await.unwrap();

        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_tries_every_publisher() {
        let storage = Arc::new(FakeStorage {
            stored: Conditions::from(vec![testing::london()]),
            ..Default::default()
        });
        let failing = Arc::new(FakePublisher {
            fail: true,
            ..Default::default()
        });
        let working = Arc::new(FakePublisher::default());
        let service = service(
            source(vec![]),
            storage,
            vec![failing.clone(), working.clone()],
        );

        let result = service.send_data().await;

        assert!(matches!(result, Err(Error::Publish(_, name)) if name == "fake-0"));
        assert_eq!(failing.published.lock().unwrap().len(), 1);
        assert_eq!(working.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_storage_error() {
        let storage = Arc::new(FakeStorage {
            fail: true,
            ..Default::default()
        });
        let publisher = Arc::new(FakePublisher::default());
        let service = service(source(vec![]), storage, vec![publisher.clone()]);

        assert!(matches!(service.send_data().await, Err(Error::Storage(..))));
        assert!(publisher.published.lock().unwrap().is_empty());
    }
}
