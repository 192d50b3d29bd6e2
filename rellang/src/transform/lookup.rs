use std::collections::HashMap;

use crate::{
    ir::{FieldId, ModelId},
    lexer::Span,
};

/// Name index built during the declare pass so that the resolve pass can
/// follow forward references. Spans are kept for "previously defined"
/// diagnostics.
#[derive(Default)]
pub(crate) struct Lookup {
    models: HashMap<String, ModelId>,
    fields: HashMap<(ModelId, String), FieldId>,
    pub(crate) model_spans: Vec<Span>,
    pub(crate) field_spans: Vec<Span>,
}

impl Lookup {
    /// Registers a model, returning the earlier id on a name collision.
    pub(crate) fn declare_model(&mut self, name: &str, id: ModelId, span: Span) -> Option<ModelId> {
        if let Some(&prev) = self.models.get(name) {
            return Some(prev);
        }
        self.models.insert(name.to_string(), id);
        debug_assert_eq!(self.model_spans.len(), id.0);
        self.model_spans.push(span);
        None
    }

    pub(crate) fn declare_field(&mut self, model: ModelId, name: &str, id: FieldId, span: Span) -> Option<FieldId> {
        if let Some(&prev) = self.fields.get(&(model, name.to_string())) {
            return Some(prev);
        }
        self.fields.insert((model, name.to_string()), id);
        debug_assert_eq!(self.field_spans.len(), id.0);
        self.field_spans.push(span);
        None
    }

    pub(crate) fn model(&self, name: &str) -> Option<ModelId> {
        self.models.get(name).copied()
    }

    pub(crate) fn field(&self, model: ModelId, name: &str) -> Option<FieldId> {
        self.fields.get(&(model, name.to_string())).copied()
    }

    pub(crate) fn model_span(&self, id: ModelId) -> Span {
        self.model_spans[id.0]
    }

    pub(crate) fn field_span(&self, id: FieldId) -> Span {
        self.field_spans[id.0]
    }
}
