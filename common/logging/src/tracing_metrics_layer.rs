//! Exposes [`MetricsLayer`]: A tracing layer that counts logging events per level.

use crate::{ERRORS_TOTAL, INFOS_TOTAL, WARNS_TOTAL};

pub struct MetricsLayer;

impl<S: tracing_core::Subscriber> tracing_subscriber::layer::Layer<S> for MetricsLayer {
    fn on_event(
        &self,
        event: &tracing_core::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let meta = event.metadata();
        if !meta.is_event() {
            return;
        }
        match *meta.level() {
            tracing_core::Level::INFO => metrics::inc_counter(&INFOS_TOTAL),
            tracing_core::Level::WARN => metrics::inc_counter(&WARNS_TOTAL),
            tracing_core::Level::ERROR => metrics::inc_counter(&ERRORS_TOTAL),
            _ => {}
        }
    }
}
