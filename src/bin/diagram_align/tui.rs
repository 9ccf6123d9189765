use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Spinner on a span showing the latest progress message.
#[derive(Debug)]
pub struct Spinner {
    span: Span,
}

impl Spinner {
    pub fn new(span: Span) -> Self {
        static TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {wide_msg}";
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            span.pb_set_style(&style);
        }
        Self { span }
    }

    pub fn set_message(&self, iteration: u32, message: &str) {
        self.span.pb_set_message(&format!("#{iteration} {message}"));
    }
}
