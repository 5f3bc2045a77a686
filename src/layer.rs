use crate::capture::AssertHandler;
use crate::handler::Record;
use crate::level::Level;
use crate::value::{Attr, Value};
use crate::INTERNAL_TARGET;
use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::span::{self, Attributes};
use tracing::{Event, Id, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that captures events into an
/// [`AssertHandler`].
///
/// Event fields become top-level attributes and the `message` field
/// becomes the record message. Each enclosing span contributes a group
/// named after the span that holds the span's fields, nested from the
/// outermost span inwards, so a field `id` of span `request` is asserted as
/// `"request.id"`.
///
/// Events below the handler's level are ignored, as are the crate's own
/// diagnostics.
#[derive(Clone, Debug)]
pub struct AssertLayer {
    handler: AssertHandler,
}

impl AssertLayer {
    pub fn new(handler: AssertHandler) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &AssertHandler {
        &self.handler
    }
}

/// Fields recorded on a span so far.
struct SpanAttrs(Vec<Attr>);

impl<S> Layer<S> for AssertLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Vec::new();
        let mut message = None;
        attrs.record(&mut FieldVisitor { fields: &mut fields, message: &mut message });
        if let Some(message) = message {
            fields.push(Attr::new("message", message));
        }
        span.extensions_mut().insert(SpanAttrs(fields));
    }

    fn on_record(&self, id: &Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(SpanAttrs(fields)) = extensions.get_mut::<SpanAttrs>() {
            let mut message = None;
            values.record(&mut FieldVisitor { fields: &mut *fields, message: &mut message });
            if let Some(message) = message {
                fields.push(Attr::new("message", message));
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target() == INTERNAL_TARGET {
            return;
        }
        let level = Level::from(*meta.level());
        if !self.handler.enabled(level) {
            return;
        }

        let mut attrs = Vec::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor { fields: &mut attrs, message: &mut message });

        if let Some(scope) = ctx.event_scope(event) {
            // Scope runs from the innermost span outwards.
            let mut nested: Option<Attr> = None;
            for span in scope {
                let mut members = span
                    .extensions()
                    .get::<SpanAttrs>()
                    .map(|attrs| attrs.0.clone())
                    .unwrap_or_default();
                members.extend(nested.take());
                nested = Some(Attr::group(span.name(), members));
            }
            attrs.extend(nested);
        }

        let record = Record {
            time: Utc::now(),
            level,
            message: message.unwrap_or_default(),
            attrs,
        };
        self.handler.handle(&record);
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Vec<Attr>,
    pub message: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn push(&mut self, field: &Field, value: impl Into<Value>) {
        self.fields.push(Attr::new(field.name(), value));
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.push(field, value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, format!("{:?}", value));
        }
    }
}
