//! Interactive terminal client for the qualle question-answering server.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a server on localhost:5000
//! qualle-chat
//!
//! # Point at another server
//! qualle-chat --url https://qa.example.org/
//!
//! # Render a captured response without a server
//! qualle-chat --replay turn.ndjson
//!
//! # Disable colors (useful for piping output)
//! qualle-chat --no-color
//! ```
//!
//! Set `RUST_LOG=qualle=debug` to see the stream reader at work on stderr.

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use qualle::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, ClickTarget, TerminalView, View, help_text,
    parse_command,
};
use qualle::tooltip::{Point, Rect};
use qualle::{AnyTransport, ChatClient, ReplayTransport};

type Controller = ChatController<AnyTransport, TerminalView>;

/// Main entry point for the qualle-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let (args, _) = ChatArgs::from_command_line_relaxed("qualle-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let transport = match &config.replay {
        Some(path) => AnyTransport::Replay(ReplayTransport::new(path)),
        None => AnyTransport::Http(ChatClient::with_options(
            Some(&config.base_url),
            Some(config.timeout),
        )?),
    };
    let target = match &config.replay {
        Some(path) => format!("replay: {}", path.display()),
        None => config.base_url.clone(),
    };
    let view = TerminalView::with_color(config.use_color);
    let mut controller = ChatController::new(transport, view, config);
    let mut rl = DefaultEditor::new()?;

    println!("Qualle Chat ({target})");
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let initial = controller.view().input_text().to_string();
        let readline = rl.readline_with_initial("You: ", (&initial, ""));

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    controller.set_input("");
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    controller.set_input("");
                    if !run_command(&mut controller, cmd) {
                        break;
                    }
                    continue;
                }

                controller.set_input(line);
                if !controller.view().send_enabled() {
                    // Keep the text so the next prompt can extend it.
                    controller.view_mut().print_info("Question too short; add a few more words.");
                    continue;
                }
                let outcome = tokio::select! {
                    result = controller.submit() => Some(result),
                    _ = tokio::signal::ctrl_c() => None,
                };
                match outcome {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => controller.view_mut().print_error(&e.to_string()),
                    None => {
                        controller.abandon_turn();
                        controller.view_mut().print_info("[interrupted]");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                controller
                    .view_mut()
                    .print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Initialize tracing on stderr.
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qualle=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Runs a slash command. Returns false when the session should end.
fn run_command(controller: &mut Controller, cmd: ChatCommand) -> bool {
    match cmd {
        ChatCommand::Quit => {
            println!("Goodbye!");
            return false;
        }
        ChatCommand::NewChat => {
            controller.new_chat();
            let session = controller.session_id();
            controller
                .view_mut()
                .print_info(&format!("New chat started (session {session})."));
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Citations => print_citations(controller),
        ChatCommand::Cite(n) => {
            let Some(message) = controller.latest_answer() else {
                controller.view_mut().print_error("No answer to cite yet.");
                return true;
            };
            // The terminal has no pointer; anchor the panel at the prompt.
            let rows = controller.view().viewport().height;
            let target = ClickTarget::Citation {
                message,
                citation: n - 1,
                anchor: Rect::new(0.0, rows - 1.0, 1.0, 1.0),
                point: Point::new(0.0, rows - 1.0),
            };
            if controller.dispatch_click(target).is_none() {
                controller
                    .view_mut()
                    .print_error(&format!("Citation {n} is missing or unreadable."));
            }
        }
        ChatCommand::Close => controller.close_tooltip(),
        ChatCommand::Session => {
            let session = controller.session_id();
            controller.view_mut().print_info(&format!("Session: {session}"));
        }
        ChatCommand::Stats => print_stats(controller),
        ChatCommand::Invalid(message) => {
            controller.view_mut().print_error(&message);
        }
    }
    true
}

fn print_citations(controller: &Controller) {
    let Some(message) = controller.latest_answer() else {
        println!("    (no answer yet)");
        return;
    };
    let citations = controller.citations(message);
    if citations.is_empty() {
        println!("    (no citations)");
        return;
    }
    for (index, link) in citations.iter().enumerate() {
        match link.reference() {
            Some(reference) => println!(
                "    {}. {} {}: {}",
                index + 1,
                link.label,
                reference.byline(),
                reference.title
            ),
            None => println!("    {}. {} (unreadable)", index + 1, link.label),
        }
    }
}

fn print_stats(controller: &Controller) {
    let stats = controller.stats();
    println!("    Session Statistics:");
    println!("      Session: {}", stats.session_id);
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Turns: {} ({} failed)",
        stats.turns, stats.failed_turns
    );
    println!("      Last turn: {:?}", stats.state);
}
