use std::io::{self, BufRead};
use std::sync::Arc;

use clap::Args;
use hyfocus_core::command::{parse_workspace_id, require_name};
use hyfocus_core::events::format_mmss;
use hyfocus_core::host::NullStateSink;
use hyfocus_core::{
    parse_start_args, Config, ConfirmOutcome, CoreError, FocusContext, Result, SpawnDecision,
    StartOutcome, StateFile, StateSink, StopOutcome, SwitchDecision, WorkspaceId,
};
use tracing::debug;

use crate::desktop::{Desktop, StderrNotifier};

const HELP: &str = "\
commands:
  start [ws[,ws...][@min]]   start a session (default: current workspace)
  stop [force]               stop, or begin the exit challenge
  toggle [args]              start if idle, stop otherwise
  confirm <answer>           answer the exit challenge
  cancel                     abandon the exit challenge
  pause | resume             pause or resume the timer
  status [json]              show session status
  allow <id> | disallow <id> edit allowed workspaces
  except <class>             add an exception window class
  unexcept <class>           remove an exception window class
  whitelist <app>            allow an app to launch
  unwhitelist <app>          remove an app from the whitelist
  goto <id>                  switch the desktop to a workspace
  move <id>                  move the focused window to a workspace
  spawn <command>            launch an application
  focus <class> [floating]   change the focused window
  quit";

#[derive(Args)]
pub struct RunArgs {
    /// Workspace the simulated desktop starts on
    #[arg(long, default_value_t = 1)]
    workspace: WorkspaceId,
    /// Do not write the widget state file
    #[arg(long)]
    no_state_file: bool,
}

enum Flow {
    Continue,
    Quit,
}

pub fn run(args: RunArgs) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let sink: Arc<dyn StateSink> = if config.notifications.state_file && !args.no_state_file {
        Arc::new(StateFile::new())
    } else {
        Arc::new(NullStateSink)
    };

    let ctx = FocusContext::new(Arc::new(StderrNotifier), sink);
    ctx.configure(&config);
    let mut desktop = Desktop::new(args.workspace);
    debug!(workspace = desktop.current, "simulated desktop ready");

    for line in io::stdin().lock().lines() {
        let line = line?;
        ctx.complete_if_due();
        match execute(&ctx, &mut desktop, line.trim()) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

fn execute(ctx: &FocusContext, desktop: &mut Desktop, line: &str) -> Result<Flow> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "start" => start(ctx, desktop, rest)?,
        "stop" => stop(ctx, rest == "force"),
        "toggle" => {
            if ctx.is_session_active() {
                stop(ctx, false);
            } else {
                start(ctx, desktop, rest)?;
            }
        }
        "confirm" => confirm(ctx, rest),
        "cancel" => {
            if ctx.cancel_challenge() {
                println!("Challenge cancelled.");
            } else {
                println!("No active challenge.");
            }
        }
        "pause" => {
            if ctx.pause() {
                println!("Focus session paused.");
            } else {
                println!("No focus session is running.");
            }
        }
        "resume" => {
            if ctx.resume() {
                println!("Focus session resumed!");
            } else {
                println!("Session is not paused.");
            }
        }
        "status" => {
            let status = ctx.status();
            if rest == "json" {
                println!("{}", serde_json::to_string(&status)?);
            } else {
                println!("{status}");
            }
        }
        "allow" => {
            let id = parse_workspace_id(rest)?;
            if ctx.allow_workspace(id) {
                println!("Workspace {id} added to allowed list.");
            } else {
                println!("Workspace {id} is already allowed.");
            }
        }
        "disallow" => {
            let id = parse_workspace_id(rest)?;
            if ctx.disallow_workspace(id) {
                println!("Workspace {id} removed from allowed list.");
            } else {
                println!("Workspace {id} was not in the allowed list.");
            }
        }
        "except" => {
            let class = require_name("window class", rest)?;
            if ctx.add_exception_class(class) {
                println!("Window class '{class}' added to exceptions.");
            } else {
                println!("Window class '{class}' is already an exception.");
            }
        }
        "unexcept" => {
            let class = require_name("window class", rest)?;
            if ctx.remove_exception_class(class) {
                println!("Window class '{class}' removed from exceptions.");
            } else {
                println!("Window class '{class}' was not an exception.");
            }
        }
        "whitelist" => {
            let app = require_name("application", rest)?;
            if ctx.whitelist_app(app) {
                println!("App '{app}' added to spawn whitelist.");
            } else {
                println!("App '{app}' is already whitelisted.");
            }
        }
        "unwhitelist" => {
            let app = require_name("application", rest)?;
            if ctx.unwhitelist_app(app) {
                println!("App '{app}' removed from spawn whitelist.");
            } else {
                println!("App '{app}' was not whitelisted.");
            }
        }
        "goto" => goto(ctx, desktop, parse_target(rest)?),
        "move" => {
            let target = parse_target(rest)?;
            match ctx.on_window_moved(&desktop.focused(), target) {
                SwitchDecision::Allow => println!("moved window to workspace {target}"),
                SwitchDecision::Revert { .. } => {
                    println!("move to workspace {target} blocked");
                }
            }
        }
        "spawn" => {
            let app = require_name("application", rest)?;
            match ctx.on_spawn(app, Some(&desktop.focused())) {
                SpawnDecision::Launch => println!("launched: {app}"),
                SpawnDecision::Suppress => println!("blocked: {app}"),
            }
        }
        "focus" => {
            let (class, floating) = match rest.rsplit_once(char::is_whitespace) {
                Some((class, "floating")) => (class.trim(), true),
                _ => (rest, false),
            };
            let class = require_name("window class", class)?;
            desktop.focus(class, floating);
            println!("focused {class}{}", if floating { " (floating)" } else { "" });
        }
        "help" => println!("{HELP}"),
        "quit" | "exit" => return Ok(Flow::Quit),
        other => println!("unknown command: {other} (try 'help')"),
    }
    Ok(Flow::Continue)
}

fn start(ctx: &FocusContext, desktop: &Desktop, args: &str) -> Result<()> {
    let request = parse_start_args(args)?;
    match ctx.start_session(&request, desktop.current) {
        StartOutcome::Started { workspaces, plan } => {
            let workspaces = workspaces
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "Focus session started! Allowed workspaces: {workspaces} ({} min work, {} min break, {} min total)",
                plan.work_min, plan.break_min, plan.total_min
            );
        }
        StartOutcome::AlreadyActive => println!("A focus session is already running."),
        StartOutcome::Failed => println!("Failed to start focus session!"),
    }
    Ok(())
}

fn stop(ctx: &FocusContext, force: bool) {
    match ctx.request_stop(force) {
        StopOutcome::NotRunning => println!("No focus session is running."),
        StopOutcome::Stopped { elapsed_secs } => {
            println!(
                "Focus session stopped. Total time: {}",
                format_mmss(elapsed_secs)
            );
        }
        StopOutcome::ChallengeIssued { prompt } => {
            println!("{prompt}");
            println!("Use: confirm <answer>");
        }
        StopOutcome::ChallengePending { prompt, hint } => {
            println!("Complete the challenge first! Use: confirm <answer>");
            println!("{prompt}");
            println!("{hint}");
        }
    }
}

fn confirm(ctx: &FocusContext, answer: &str) {
    if answer.is_empty() {
        println!("Please provide an answer: confirm <answer>");
        return;
    }
    match ctx.confirm(answer) {
        ConfirmOutcome::NoChallenge => println!("No active challenge. Use stop first."),
        ConfirmOutcome::Passed { elapsed_secs } => {
            println!(
                "Challenge passed! Session stopped. Total time: {}",
                format_mmss(elapsed_secs)
            );
        }
        ConfirmOutcome::MoreConfirmations { remaining, .. } => {
            println!("Keep going! {remaining} more confirmations needed.");
        }
        ConfirmOutcome::Wrong { hint } => println!("Wrong answer! {hint}"),
    }
}

/// Switch the desktop and play the host's part of a revert.
fn goto(ctx: &FocusContext, desktop: &mut Desktop, target: WorkspaceId) {
    desktop.current = target;
    match ctx.on_workspace_changed(target, Some(&desktop.focused())) {
        SwitchDecision::Allow => println!("on workspace {target}"),
        SwitchDecision::Revert { to } => {
            desktop.current = to;
            ctx.on_workspace_changed(to, Some(&desktop.focused()));
            ctx.revert_finished();
            println!("workspace {target} blocked, back on workspace {to}");
        }
    }
    debug!(position = ?desktop.window_position(), "focused window position");
}

/// Host workspace ids may be negative (special workspaces), unlike ids
/// the user allows.
fn parse_target(arg: &str) -> Result<WorkspaceId> {
    arg.trim()
        .parse::<WorkspaceId>()
        .map_err(|_| CoreError::Custom(format!("invalid workspace id '{}'", arg.trim())))
}
