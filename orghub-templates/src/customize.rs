//! Per-context customization of template fields and views.
//!
//! The catalog invokes the installed [`ProjectCustomizer`] on every
//! application. The default, [`PassThrough`], copies fields and views
//! unchanged; deployments that need context-specific boards install their own.

use orghub_core::{FieldDef, ViewDef};

use crate::context::ApplyContext;

pub trait ProjectCustomizer: Send + Sync {
    fn customize_fields(&self, fields: &[FieldDef], _ctx: &ApplyContext) -> Vec<FieldDef> {
        fields.to_vec()
    }

    fn customize_views(&self, views: &[ViewDef], _ctx: &ApplyContext) -> Vec<ViewDef> {
        views.to_vec()
    }
}

/// Identity customization.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ProjectCustomizer for PassThrough {}
