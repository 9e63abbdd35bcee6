use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    scheduler::Schedule,
    service::{self, WeatherService},
};

pub struct Component<T: ?Sized> {
    pub name: String,

    pub component: Arc<T>,
}

impl<T: ?Sized> Component<T> {
    pub fn new(name: impl Into<String>, component: impl Into<Arc<T>>) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
        }
    }
}

pub struct Topology {
    pub service: WeatherService,

    pub collect: Schedule,

    pub send: Schedule,
}

/// Initialises storage then runs the collect and send schedules until
/// `cancel` fires.
pub async fn run(topology: Topology, cancel: CancellationToken) -> Result<(), service::Error> {
    let service = Arc::new(topology.service);
    service.init().await?;

    info!(
        cities = service.cities.len(),
        source = %service.source.name,
        storage = %service.storage.name,
        publishers = service.publishers.len(),
        "weather collector started"
    );

    let collect = topology.collect.run(cancel.clone(), || {
        let service = service.clone();
        let cancel = cancel.clone();
        async move { service.collect_data(cancel).await }
    });

    let send = topology.send.run(cancel.clone(), || {
        let service = service.clone();
        async move { service.send_data().await }
    });

    tokio::join!(collect, send);

    info!("weather collector stopped");

    Ok(())
}
