use agent_chat_stream::{
    ChatConfig, ConversationController, ConversationView, HttpChatService, Role, TurnOutcome,
};
use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agent-chat", about = "Chat with an agent over a streamed response")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Agent service base URL, overrides the configuration
    #[arg(long)]
    base_url: Option<String>,

    /// User id sent with every request
    #[arg(long)]
    user_id: Option<String>,
}

/// Prints answer turns to stdout as they grow, one suffix at a time.
///
/// Follows transcript indices rather than `current_answer`, since one view
/// update can already hold a finished answer plus the start of the next.
struct AnswerPrinter {
    turn: usize,
    printed: usize,
}

impl AnswerPrinter {
    /// Only turns at or after `first_turn` belong to this submission
    fn starting_at(first_turn: usize) -> Self {
        Self {
            turn: first_turn,
            printed: 0,
        }
    }

    fn render(&mut self, view: &ConversationView) {
        let output = self.advance(view);
        if !output.is_empty() {
            print!("{}", output);
            let _ = std::io::stdout().flush();
        }
    }

    /// Text not yet printed for this submission's answer turns
    fn advance(&mut self, view: &ConversationView) -> String {
        let mut output = String::new();

        for (index, turn) in view.transcript.iter().enumerate().skip(self.turn) {
            if turn.role != Role::Answer {
                continue;
            }
            if index != self.turn {
                if self.printed > 0 {
                    output.push('\n');
                }
                self.turn = index;
                self.printed = 0;
            }

            output.push_str(turn.text.get(self.printed..).unwrap_or_default());
            self.printed = turn.text.len();
        }

        output
    }
}

fn load_config(args: &Args) -> anyhow::Result<ChatConfig> {
    let mut config = match (&args.config, &args.base_url) {
        (Some(path), _) => ChatConfig::from_file(path)?,
        (None, Some(base_url)) => ChatConfig::with_base_url(base_url.clone()),
        (None, None) => ChatConfig::from_env()?,
    };

    if let Some(base_url) = &args.base_url {
        config.server.base_url = base_url.clone();
    }
    if let Some(user_id) = &args.user_id {
        config.server.user_id = user_id.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    eprintln!("Connecting to {} ...", config.server.base_url);

    let service = Arc::new(HttpChatService::new(&config)?);
    let mut controller = ConversationController::start(service, &config)
        .await
        .context("Failed to create conversation, please retry")?;

    let preview = &controller.session().preview;
    println!("== {} ==", preview.name);
    if !preview.opening_message.is_empty() {
        println!("{}", preview.opening_message);
    }
    println!();

    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !cancel.cancel() {
                eprintln!("\n(type /quit or press Ctrl-D to exit)");
            }
        }
    });

    let mut view_rx = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }

        let mut printer = AnswerPrinter::starting_at(controller.transcript().len());
        let submit = controller.submit(&line);
        tokio::pin!(submit);

        let outcome = loop {
            tokio::select! {
                outcome = &mut submit => break outcome,
                changed = view_rx.changed() => {
                    if changed.is_ok() {
                        printer.render(&view_rx.borrow_and_update());
                    }
                }
            }
        };
        printer.render(&view_rx.borrow_and_update());

        match outcome {
            Ok(TurnOutcome::Completed) | Ok(TurnOutcome::Busy) => println!(),
            Ok(TurnOutcome::Cancelled) => println!("\n[stopped]"),
            Ok(TurnOutcome::Failed(message)) => eprintln!("\nerror: {}", message),
            Err(e) => eprintln!("{}", e),
        }
        println!();
    }

    tracing::info!("{}", controller.metrics());
    Ok(())
}
