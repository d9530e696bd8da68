use super::painter::{MicroService, Painter};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphBuildError {
    #[error("no collector was given")]
    MissingCollector,

    #[error("at least one microservice is required")]
    NoMicroServices,

    #[error("no policy was given")]
    MissingPolicy,
}

/// Assembles the collector -> microservices -> policy chain of a control
/// loop and hands it to a [`Painter`].
pub struct LoopGraphBuilder<P: Painter> {
    painter: P,
    collector: Option<String>,
    micro_services: Vec<MicroService>,
    policy: Option<String>,
}

impl<P: Painter> LoopGraphBuilder<P> {
    pub fn new(painter: P) -> Self {
        Self {
            painter,
            collector: None,
            micro_services: Vec::new(),
            policy: None,
        }
    }

    pub fn collector(mut self, collector: impl Into<String>) -> Self {
        self.collector = Some(collector.into());
        self
    }

    pub fn add_micro_service(mut self, micro_service: MicroService) -> Self {
        self.micro_services.push(micro_service);
        self
    }

    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    /// Paint the chain. The painter is only called when every part is present.
    pub fn build(self) -> Result<P::Output, GraphBuildError> {
        let collector = self.collector.ok_or(GraphBuildError::MissingCollector)?;
        if self.micro_services.is_empty() {
            return Err(GraphBuildError::NoMicroServices);
        }
        let policy = self.policy.ok_or(GraphBuildError::MissingPolicy)?;

        Ok(self.painter.paint(&collector, &self.micro_services, &policy))
    }
}
