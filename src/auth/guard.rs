use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::{RequestContext, SessionContext};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// API, health and uploads. Actions enforce their own auth.
    Passthrough,
    Public,
    /// `/sign-in` and `/sign-up`.
    AuthPage,
    Onboarding,
    Dashboard,
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    Redirect(&'static str),
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn classify(path: &str) -> PathKind {
    if under(path, "/api") || under(path, "/uploads") || path == "/health" || path == "/readyz" {
        PathKind::Passthrough
    } else if path == "/" || under(path, "/auth") {
        PathKind::Public
    } else if path == "/sign-in" || path == "/sign-up" {
        PathKind::AuthPage
    } else if under(path, "/onboarding") {
        PathKind::Onboarding
    } else if under(path, "/dashboard") {
        PathKind::Dashboard
    } else {
        PathKind::Protected
    }
}

/// Onboarded means the profile carries gender and age. Only consulted for
/// signed-in requests to onboarding and dashboard pages.
pub fn guard_decision(kind: PathKind, signed_in: bool, onboarded: bool) -> GuardDecision {
    match (kind, signed_in) {
        (PathKind::Passthrough | PathKind::Public, _) => GuardDecision::Continue,
        (PathKind::AuthPage, true) => GuardDecision::Redirect("/dashboard"),
        (PathKind::AuthPage, false) => GuardDecision::Continue,
        (_, false) => GuardDecision::Redirect("/sign-in"),
        (PathKind::Onboarding, true) if onboarded => GuardDecision::Redirect("/dashboard"),
        (PathKind::Dashboard, true) if !onboarded => GuardDecision::Redirect("/onboarding"),
        _ => GuardDecision::Continue,
    }
}

fn needs_profile(kind: PathKind) -> bool {
    matches!(kind, PathKind::Onboarding | PathKind::Dashboard)
}

pub async fn route_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let kind = classify(req.uri().path());
    let ctx: SessionContext = req
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_else(|| Arc::new(RequestContext::anonymous()));
    let signed_in = ctx.user().is_some();

    let onboarded = if signed_in && needs_profile(kind) {
        match ctx.profile(state.store.as_ref()).await {
            Ok(profile) => profile.is_some_and(|p| p.is_onboarded()),
            Err(e) => {
                tracing::warn!(error = %e, "Profile lookup failed in route guard");
                false
            }
        }
    } else {
        false
    };

    match guard_decision(kind, signed_in, onboarded) {
        GuardDecision::Continue => next.run(req).await,
        GuardDecision::Redirect(to) => {
            tracing::debug!(path = %req.uri().path(), to, "Route guard redirect");
            Redirect::to(to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("/api/daily-logs"), PathKind::Passthrough);
        assert_eq!(classify("/uploads/a.png"), PathKind::Passthrough);
        assert_eq!(classify("/readyz"), PathKind::Passthrough);
        assert_eq!(classify("/"), PathKind::Public);
        assert_eq!(classify("/auth/callback"), PathKind::Public);
        assert_eq!(classify("/sign-up"), PathKind::AuthPage);
        assert_eq!(classify("/onboarding"), PathKind::Onboarding);
        assert_eq!(classify("/dashboard/progress"), PathKind::Dashboard);
        assert_eq!(classify("/dashboards"), PathKind::Protected);
        assert_eq!(classify("/apix"), PathKind::Protected);
    }

    #[test]
    fn test_signed_out_redirects_to_sign_in() {
        for path in ["/dashboard", "/dashboard/log", "/onboarding", "/settings"] {
            assert_eq!(
                guard_decision(classify(path), false, false),
                GuardDecision::Redirect("/sign-in"),
                "{path}"
            );
        }
        assert_eq!(guard_decision(classify("/sign-in"), false, false), GuardDecision::Continue);
        assert_eq!(guard_decision(classify("/"), false, false), GuardDecision::Continue);
        assert_eq!(
            guard_decision(classify("/api/profile"), false, false),
            GuardDecision::Continue
        );
    }

    #[test]
    fn test_signed_in_skips_auth_pages() {
        assert_eq!(
            guard_decision(PathKind::AuthPage, true, false),
            GuardDecision::Redirect("/dashboard")
        );
    }

    #[test]
    fn test_onboarding_state_routing() {
        assert_eq!(
            guard_decision(PathKind::Dashboard, true, false),
            GuardDecision::Redirect("/onboarding")
        );
        assert_eq!(guard_decision(PathKind::Dashboard, true, true), GuardDecision::Continue);
        assert_eq!(
            guard_decision(PathKind::Onboarding, true, true),
            GuardDecision::Redirect("/dashboard")
        );
        assert_eq!(guard_decision(PathKind::Onboarding, true, false), GuardDecision::Continue);
    }
}
