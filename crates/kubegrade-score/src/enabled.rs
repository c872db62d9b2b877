//! Annotation-driven check enablement
//!
//! Decides, per object and per check, whether the check executes. The
//! precedence table is encoded as an explicit ordered list of steps; the
//! first step that returns a verdict wins. Pod-template annotations outrank
//! the object's own annotations, per-check directives outrank list
//! membership within the same source, and mandatory checks run by default.

use kubegrade_core::{Check, RunConfiguration};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-check directive annotation: `kubegrade/<check-id>: allow|deny|...`
pub const DIRECTIVE_PREFIX: &str = "kubegrade/";
/// Comma-separated check ids (or groups, or `*`) to skip.
pub const IGNORE_ANNOTATION: &str = "kubegrade/ignore";
/// Comma-separated optional check ids (or groups, or `*`) to turn on.
pub const ENABLE_ANNOTATION: &str = "kubegrade/enable";

/// Group names that expand to several check ids. Covers checks that were
/// split after the group annotation was already in the wild.
static IMPLIED_GROUPS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut groups: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    groups.insert(
        "container-security-context",
        &[
            "container-security-context-user-group-id",
            "container-security-context-privileged",
            "container-security-context-readonlyrootfilesystem",
        ],
    );
    groups
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Run,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Allow,
    Deny,
}

type Annotations = BTreeMap<String, String>;

/// The run-wide half of the decision inputs.
#[derive(Debug, Clone)]
pub struct EnablementPolicy {
    use_ignore_annotations: bool,
    use_enable_annotations: bool,
    enabled_optional: BTreeSet<String>,
}

struct StepContext<'a> {
    policy: &'a EnablementPolicy,
    check: &'a Check,
    template: Option<&'a Annotations>,
    object: Option<&'a Annotations>,
}

type Step = fn(&StepContext<'_>) -> Option<Verdict>;

/// The precedence table, top to bottom; first match wins. Mandatory checks
/// fall through every step and run.
const STEPS: &[Step] = &[
    template_directive,
    template_ignore_list,
    template_enable_list,
    object_directive,
    object_ignore_list,
    object_enable_list,
    run_config_enabled,
    optional_skips_by_default,
];

impl EnablementPolicy {
    pub fn from_config(config: &RunConfiguration) -> Self {
        Self {
            use_ignore_annotations: config.use_ignore_annotations,
            use_enable_annotations: config.use_enable_annotations,
            enabled_optional: config.enabled_optional_checks.clone(),
        }
    }

    /// Should this check run against an object with these annotation
    /// sources? `template` is the pod template's annotations for workloads,
    /// `None` for everything else.
    pub fn decide(
        &self,
        check: &Check,
        template: Option<&Annotations>,
        object: Option<&Annotations>,
    ) -> Verdict {
        let ctx = StepContext {
            policy: self,
            check,
            template,
            object,
        };
        STEPS
            .iter()
            .find_map(|step| step(&ctx))
            .unwrap_or(Verdict::Run)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn directive(annotations: Option<&Annotations>, check: &Check) -> Option<Directive> {
    let key = format!("{DIRECTIVE_PREFIX}{}", check.id);
    let value = annotations?.get(&key)?;
    match normalize(value).as_str() {
        "allow" | "allowed" | "enable" | "enabled" | "yes" => Some(Directive::Allow),
        "deny" | "denied" | "disable" | "disabled" | "no" => Some(Directive::Deny),
        // Unknown directive values fall through to the list checks.
        _ => None,
    }
}

fn directive_verdict(ctx: &StepContext<'_>, annotations: Option<&Annotations>) -> Option<Verdict> {
    match directive(annotations, ctx.check)? {
        Directive::Allow if ctx.policy.use_enable_annotations => Some(Verdict::Run),
        Directive::Deny if ctx.policy.use_ignore_annotations => Some(Verdict::Skip),
        _ => None,
    }
}

/// Does a comma-separated id list name this check, directly, through a
/// group, or with the `*` wildcard?
fn list_contains(list: &str, check_id: &str) -> bool {
    list.split(',').map(str::trim).any(|entry| {
        entry == check_id
            || entry == "*"
            || IMPLIED_GROUPS
                .get(entry)
                .is_some_and(|ids| ids.contains(&check_id))
    })
}

fn list_verdict(
    annotations: Option<&Annotations>,
    key: &str,
    check_id: &str,
    verdict: Verdict,
) -> Option<Verdict> {
    let list = annotations?.get(key)?;
    list_contains(list, check_id).then_some(verdict)
}

fn template_directive(ctx: &StepContext<'_>) -> Option<Verdict> {
    directive_verdict(ctx, ctx.template)
}

fn template_ignore_list(ctx: &StepContext<'_>) -> Option<Verdict> {
    if !ctx.policy.use_ignore_annotations {
        return None;
    }
    list_verdict(ctx.template, IGNORE_ANNOTATION, &ctx.check.id, Verdict::Skip)
}

fn template_enable_list(ctx: &StepContext<'_>) -> Option<Verdict> {
    if !ctx.policy.use_enable_annotations {
        return None;
    }
    list_verdict(ctx.template, ENABLE_ANNOTATION, &ctx.check.id, Verdict::Run)
}

fn object_directive(ctx: &StepContext<'_>) -> Option<Verdict> {
    directive_verdict(ctx, ctx.object)
}

fn object_ignore_list(ctx: &StepContext<'_>) -> Option<Verdict> {
    if !ctx.policy.use_ignore_annotations {
        return None;
    }
    list_verdict(ctx.object, IGNORE_ANNOTATION, &ctx.check.id, Verdict::Skip)
}

fn object_enable_list(ctx: &StepContext<'_>) -> Option<Verdict> {
    if !ctx.policy.use_enable_annotations {
        return None;
    }
    list_verdict(ctx.object, ENABLE_ANNOTATION, &ctx.check.id, Verdict::Run)
}

fn run_config_enabled(ctx: &StepContext<'_>) -> Option<Verdict> {
    ctx.policy
        .enabled_optional
        .contains(&ctx.check.id)
        .then_some(Verdict::Run)
}

fn optional_skips_by_default(ctx: &StepContext<'_>) -> Option<Verdict> {
    ctx.check.optional.then_some(Verdict::Skip)
}
