// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Script Template Engine
//!
//! Renders the bash scripts that drive the external tools, using Handlebars
//! for placeholder substitution.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn named script templates plus a serde context into bash
//! - **Integration:** easy-rsa, acbuild, rkt, git and ssh adapters → `ScriptRunner`
//!
//! # Helpers
//!
//! - `{{q value}}` - POSIX shell quoting of a single word
//!
//! HTML escaping is disabled; every interpolated path or name must go through
//! `q` unless it is a trusted static command line.

use crate::domain::shell::{quote, ShellError};
use handlebars::{handlebars_helper, Handlebars};
use serde::Serialize;

// ============================================================================
// Named templates
// ============================================================================

const TEMPLATES: &[(&str, &str)] = &[
    ("easyrsa-init", include_str!("../../templates/scripts/easyrsa-init.sh.hbs")),
    ("easyrsa-issue", include_str!("../../templates/scripts/easyrsa-issue.sh.hbs")),
    ("easyrsa-dh", include_str!("../../templates/scripts/easyrsa-dh.sh.hbs")),
    ("acbuild-base", include_str!("../../templates/scripts/acbuild-base.sh.hbs")),
    ("acbuild-derived", include_str!("../../templates/scripts/acbuild-derived.sh.hbs")),
    ("acbuild-component", include_str!("../../templates/scripts/acbuild-component.sh.hbs")),
    ("gpg-sign", include_str!("../../templates/scripts/gpg-sign.sh.hbs")),
    ("docker2aci", include_str!("../../templates/scripts/docker2aci.sh.hbs")),
    ("rkt-builder", include_str!("../../templates/scripts/rkt-builder.sh.hbs")),
    ("native-build", include_str!("../../templates/scripts/native-build.sh.hbs")),
    ("git-clone", include_str!("../../templates/scripts/git-clone.sh.hbs")),
    ("git-checkout", include_str!("../../templates/scripts/git-checkout.sh.hbs")),
    ("rkt-prepare", include_str!("../../templates/scripts/rkt-prepare.sh.hbs")),
    ("rkt-run", include_str!("../../templates/scripts/rkt-run.sh.hbs")),
    ("rkt-run-prepared", include_str!("../../templates/scripts/rkt-run-prepared.sh.hbs")),
    ("setup", include_str!("../../templates/scripts/setup.sh.hbs")),
    ("deploy", include_str!("../../templates/scripts/deploy.sh.hbs")),
];

handlebars_helper!(shell_quote: |value: str| quote(value));

// ============================================================================
// Template Engine
// ============================================================================

pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self, ShellError> {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("q", Box::new(shell_quote));

        for (name, source) in TEMPLATES {
            handlebars
                .register_template_string(name, *source)
                .map_err(|e| ShellError::Render {
                    template: (*name).to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Render one of the registered script templates
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, ShellError> {
        self.handlebars
            .render(name, context)
            .map_err(|e| ShellError::Render {
                template: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Render an ad-hoc template such as a component provisioning hook
    pub fn render_str<T: Serialize>(
        &self,
        label: &str,
        template: &str,
        context: &T,
    ) -> Result<String, ShellError> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| ShellError::Render {
                template: label.to_string(),
                reason: e.to_string(),
            })
    }
}
