/// A microservice stage of a control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroService {
    pub name: String,
    pub model_type: String,
    /// Name of the stage feeding this one; empty when fed by the collector.
    pub input_from: String,
}

impl MicroService {
    pub fn new(
        name: impl Into<String>,
        model_type: impl Into<String>,
        input_from: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model_type: model_type.into(),
            input_from: input_from.into(),
        }
    }
}

/// Renders a complete loop chain.
pub trait Painter {
    type Output;

    fn paint(&self, collector: &str, micro_services: &[MicroService], policy: &str) -> Self::Output;
}

/// Renders the chain as `collector -> ms1 -> ms2 -> policy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainPainter;

impl Painter for ChainPainter {
    type Output = String;

    fn paint(&self, collector: &str, micro_services: &[MicroService], policy: &str) -> String {
        std::iter::once(collector)
            .chain(micro_services.iter().map(|ms| ms.name.as_str()))
            .chain(std::iter::once(policy))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
