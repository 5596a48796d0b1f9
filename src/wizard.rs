use colored::Colorize;

use crate::error::{Result, ValidationError};
use crate::prompt::{Nav, Prompter, any_text};
use crate::validation::{validate_hostname, validate_port, validate_tunnel_name, validate_url};

// ─── Engine ─────────────────────────────────────────────────

/// What a step asks the engine to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    Back,
    Cancel,
    /// Declined review: step back without it counting as navigation.
    Revise,
}

impl<T> From<Nav<T>> for Flow {
    fn from(nav: Nav<T>) -> Self {
        match nav {
            Nav::Proceed(_) => Flow::Next,
            Nav::Back => Flow::Back,
            Nav::Cancel => Flow::Cancel,
        }
    }
}

/// Unwrap `Nav::Proceed` inside a step, or end the step with the matching flow.
macro_rules! step_value {
    ($nav:expr) => {
        match $nav {
            Nav::Proceed(value) => value,
            other => return Ok(Flow::from(other)),
        }
    };
}

pub type StepFn<S> = fn(&mut dyn Prompter, &mut S) -> Result<Flow>;

pub struct Step<S> {
    pub title: &'static str,
    pub run: StepFn<S>,
}

/// Run `steps` in order over shared `state`, following each step's
/// [`Flow`]. Going back from the first step returns `Nav::Back`; cancel
/// from any step returns `Nav::Cancel`. Values already in `state` survive
/// going back.
pub fn run_steps<S>(
    prompter: &mut dyn Prompter,
    state: &mut S,
    steps: &[Step<S>],
    header: fn(),
) -> Result<Nav<()>> {
    let mut current = 0;
    header();

    while current < steps.len() {
        let step = &steps[current];
        println!("{}", format!("Step {} of {}: {}", current + 1, steps.len(), step.title).bold());
        println!();

        match (step.run)(prompter, state)? {
            Flow::Next => current += 1,
            Flow::Back if current == 0 => return Ok(Nav::Back),
            Flow::Back => {
                current -= 1;
                header();
            }
            Flow::Revise => current = current.saturating_sub(1),
            Flow::Cancel => return Ok(Nav::Cancel),
        }
    }

    Ok(Nav::Proceed(()))
}

// ─── Add wizard ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Http,
    Tcp,
    Custom,
}

/// Collected answers for a new tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddAnswers {
    pub name: String,
    pub url: String,
    pub hostname: Option<String>,
}

#[derive(Debug, Default)]
struct AddState {
    existing: Vec<String>,
    name: String,
    service: Option<ServiceKind>,
    url: String,
    hostname: Option<String>,
}

fn add_header() {
    println!("{}", "Create a new Cloudflare tunnel".bold());
    println!("{}", "Use \"Go back\" to navigate between steps".dimmed());
    println!();
}

fn add_steps() -> [Step<AddState>; 5] {
    [
        Step { title: "Tunnel Name", run: ask_name },
        Step { title: "Service Type", run: ask_service_type },
        Step { title: "Service Configuration", run: ask_service_config },
        Step { title: "Hostname", run: ask_hostname },
        Step { title: "Confirmation", run: review },
    ]
}

/// Walk the operator through naming and configuring a new tunnel.
/// `existing` names are rejected at the name step.
pub fn add_wizard(prompter: &mut dyn Prompter, existing: &[String]) -> Result<Nav<AddAnswers>> {
    let mut state = AddState {
        existing: existing.to_vec(),
        ..Default::default()
    };

    Ok(match run_steps(prompter, &mut state, &add_steps(), add_header)? {
        Nav::Proceed(()) => Nav::Proceed(AddAnswers {
            name: state.name,
            url: state.url,
            hostname: state.hostname,
        }),
        Nav::Back => Nav::Back,
        Nav::Cancel => Nav::Cancel,
    })
}

fn ask_name(p: &mut dyn Prompter, state: &mut AddState) -> Result<Flow> {
    let existing = state.existing.clone();
    let validate = move |name: &str| -> std::result::Result<(), ValidationError> {
        validate_tunnel_name(name)?;
        if existing.iter().any(|n| n == name) {
            return Err(ValidationError::new(format!("Tunnel '{}' already exists", name)));
        }
        Ok(())
    };
    let previous = (!state.name.is_empty()).then(|| state.name.clone());
    state.name = p.input("Tunnel name:", previous.as_deref(), &validate)?;
    Ok(Flow::Next)
}

fn ask_service_type(p: &mut dyn Prompter, state: &mut AddState) -> Result<Flow> {
    let items = [
        "HTTP/HTTPS web service",
        "TCP service (SSH, database, etc.)",
        "Custom URL",
    ]
    .map(String::from);
    let idx = step_value!(p.select_nav("Service type:", &items)?);
    state.service = Some(match idx {
        0 => ServiceKind::Http,
        1 => ServiceKind::Tcp,
        _ => ServiceKind::Custom,
    });
    Ok(Flow::Next)
}

fn ask_service_config(p: &mut dyn Prompter, state: &mut AddState) -> Result<Flow> {
    let url = match state.service.unwrap_or(ServiceKind::Custom) {
        ServiceKind::Http => {
            let items = ["HTTP", "HTTPS"].map(String::from);
            let scheme = match step_value!(p.select_nav("Protocol:", &items)?) {
                0 => "http",
                _ => "https",
            };
            let host = p.input("Host (e.g., localhost or 127.0.0.1):", Some("localhost"), &any_text)?;
            let port = p.input("Port:", Some(default_port(scheme)), &validate_port)?;
            format!("{}://{}:{}", scheme, host, port)
        }
        ServiceKind::Tcp => {
            let items = ["SSH", "RDP (Remote Desktop)", "Generic TCP"].map(String::from);
            let scheme = match step_value!(p.select_nav("TCP service type:", &items)?) {
                0 => "ssh",
                1 => "rdp",
                _ => "tcp",
            };
            let host = p.input("Host:", Some("localhost"), &any_text)?;
            let port = p.input("Port:", Some(default_port(scheme)), &validate_port)?;
            format!("{}://{}:{}", scheme, host, port)
        }
        ServiceKind::Custom => p.input("Service URL:", None, &validate_url)?,
    };
    state.url = url;
    Ok(Flow::Next)
}

fn ask_hostname(p: &mut dyn Prompter, state: &mut AddState) -> Result<Flow> {
    let wanted = step_value!(p.confirm_nav("Do you want to assign a hostname?", true)?);
    state.hostname = if wanted {
        Some(p.input(
            "Hostname (e.g., app.example.com):",
            state.hostname.as_deref(),
            &validate_hostname,
        )?)
    } else {
        None
    };
    Ok(Flow::Next)
}

fn review(p: &mut dyn Prompter, state: &mut AddState) -> Result<Flow> {
    println!("Review your tunnel configuration:");
    println!();
    println!("  {} {}", "Name:".dimmed(), state.name);
    println!("  {} {}", "URL:".dimmed(), state.url);
    if let Some(ref h) = state.hostname {
        println!("  {} {}", "Hostname:".dimmed(), h);
    }
    println!();

    Ok(match step_value!(p.confirm_nav("Create this tunnel?", true)?) {
        true => Flow::Next,
        false => Flow::Revise,
    })
}

fn default_port(scheme: &str) -> &'static str {
    match scheme {
        "https" => "443",
        "ssh" => "22",
        "rdp" => "3389",
        "tcp" => "8080",
        _ => "80",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::scripted::{Answer::*, ScriptedPrompter};

    fn run(answers: Vec<crate::prompt::scripted::Answer>) -> (Nav<AddAnswers>, ScriptedPrompter) {
        let mut p = ScriptedPrompter::new(answers);
        let nav = add_wizard(&mut p, &["taken".to_string()]).unwrap();
        (nav, p)
    }

    #[test]
    fn http_with_defaults() {
        let (nav, p) = run(vec![
            Text("web-app"),
            Pick(0), // http/https
            Pick(1), // https
            Text(""),
            Text(""),
            No, // no hostname
            Yes,
        ]);
        assert_eq!(
            nav,
            Nav::Proceed(AddAnswers {
                name: "web-app".into(),
                url: "https://localhost:443".into(),
                hostname: None,
            })
        );
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn tcp_rdp_with_hostname() {
        let (nav, _) = run(vec![
            Text("desk"),
            Pick(1),
            Pick(1), // rdp
            Text("10.0.0.5"),
            Text(""),
            Yes,
            Text("desk.example.com"),
            Yes,
        ]);
        let Nav::Proceed(a) = nav else { panic!("expected answers") };
        assert_eq!(a.url, "rdp://10.0.0.5:3389");
        assert_eq!(a.hostname.as_deref(), Some("desk.example.com"));
    }

    #[test]
    fn name_step_rejects_invalid_and_existing() {
        let (nav, p) = run(vec![
            Text("ab"),
            Text("taken"),
            Text("fresh"),
            Pick(2),
            Text("http://localhost:3000"),
            No,
            Yes,
        ]);
        assert!(matches!(nav, Nav::Proceed(ref a) if a.name == "fresh"));
        assert_eq!(p.rejected.len(), 2);
    }

    #[test]
    fn back_returns_to_previous_step_keeping_values() {
        let (nav, p) = run(vec![
            Text("keepme"),
            Pick(0),
            Back, // protocol prompt → back to service type
            Pick(2),
            Text("http://localhost:9000"),
            No,
            Yes,
        ]);
        let Nav::Proceed(a) = nav else { panic!("expected answers") };
        assert_eq!(a.name, "keepme");
        assert_eq!(a.url, "http://localhost:9000");
        assert_eq!(p.prompts.iter().filter(|s| *s == "Tunnel name:").count(), 1);
        assert_eq!(p.prompts.iter().filter(|s| *s == "Service type:").count(), 2);
    }

    #[test]
    fn back_twice_reaches_name_with_previous_default() {
        let (nav, _) = run(vec![
            Text("first"),
            Pick(0),
            Back, // protocol → service type
            Back, // service type → name
            Text(""), // keep previous name
            Pick(2),
            Text("tcp://db:5432"),
            No,
            Yes,
        ]);
        assert!(matches!(nav, Nav::Proceed(ref a) if a.name == "first" && a.url == "tcp://db:5432"));
    }

    #[test]
    fn back_at_first_step_exits_wizard() {
        let mut state = AddState::default();
        let mut p = ScriptedPrompter::new([Back]);
        let steps = [Step { title: "Service Type", run: ask_service_type }];
        let nav = run_steps(&mut p, &mut state, &steps, add_header).unwrap();
        assert_eq!(nav, Nav::Back);
    }

    #[test]
    fn cancel_at_any_step_unwinds() {
        let (nav, _) = run(vec![Text("web"), Cancel]);
        assert_eq!(nav, Nav::Cancel);

        let (nav, _) = run(vec![Text("web"), Pick(2), Text("http://x:1"), Cancel]);
        assert_eq!(nav, Nav::Cancel);

        let (nav, _) = run(vec![Text("web"), Pick(2), Text("http://x:1"), No, Cancel]);
        assert_eq!(nav, Nav::Cancel);
    }

    #[test]
    fn declined_review_redoes_hostname() {
        let (nav, p) = run(vec![
            Text("web"),
            Pick(2),
            Text("http://x:1"),
            No,
            No, // decline review
            Yes,
            Text("web.example.com"),
            Yes,
        ]);
        let Nav::Proceed(a) = nav else { panic!("expected answers") };
        assert_eq!(a.hostname.as_deref(), Some("web.example.com"));
        assert_eq!(p.prompts.iter().filter(|s| *s == "Create this tunnel?").count(), 2);
    }
}
