use chat::callbacks;
use chat::llm::Turn;
use chat::{Personality, Reply, Result, Session};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

const SUMMARIZED_WARNING: &str =
    "The conversation has been summarized. Please start a new conversation if earlier details needed.";

const HELP: &str = "\
/personality <essayist|regular|expert>  switch personality
/system <text>                          use a custom system prompt
/model <id>                             switch model
/clear                                  clear chat memory
/reset                                  clear recorded conversation and memory
/save <file.md|file.html>               download the conversation as markdown or html
/json <file.json>                       save the conversation as json
/quit                                   exit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Say(String),
    Personality(Personality),
    System(String),
    Model(String),
    Clear,
    Reset,
    Save(String),
    Json(String),
    Help,
    Quit,
}

fn parse(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map(|(name, arg)| (name, arg.trim()))
        .unwrap_or((rest, ""));

    let required = |arg: &str| {
        if arg.is_empty() {
            Err(format!("/{name} needs an argument"))
        } else {
            Ok(arg.to_string())
        }
    };

    match name {
        "personality" => arg
            .parse()
            .map(Command::Personality)
            .map_err(|e: chat::Error| e.to_string()),
        "system" => required(arg).map(Command::System),
        "model" => required(arg).map(Command::Model),
        "clear" => Ok(Command::Clear),
        "reset" => Ok(Command::Reset),
        "save" => required(arg).map(Command::Save),
        "json" => required(arg).map(Command::Json),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command /{other}, try /help")),
    }
}

/// Writes streamed chunks, remembering the first failure instead of dropping it.
struct ChunkWriter<W: Write> {
    out: W,
    error: Option<std::io::Error>,
}

impl<W: Write> ChunkWriter<W> {
    fn new(out: W) -> Self {
        Self { out, error: None }
    }

    fn write(&mut self, chunk: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self
            .out
            .write_all(chunk.as_bytes())
            .and_then(|()| self.out.flush())
        {
            self.error = Some(e);
        }
    }

    fn finish(self) -> std::io::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn say(session: &mut Session, prompt: &str, stream: bool) -> Result<Reply> {
    if stream {
        let mut writer = ChunkWriter::new(std::io::stdout());
        let reply = session
            .send_streaming(prompt, |chunk| writer.write(chunk))
            .await;
        println!();
        if let Err(e) = writer.finish() {
            error!(error = %e, "could not print the streamed reply");
        }
        reply
    } else {
        let reply = session.send(prompt).await?;
        println!("{}", reply.content);
        Ok(reply)
    }
}

/// Html for `.html` paths, markdown otherwise.
fn render_for(path: &str, turns: &[Turn]) -> String {
    if path.ends_with(".html") {
        callbacks::render_transcript_html(turns)
    } else {
        callbacks::render_transcript(turns)
    }
}

pub async fn run(mut session: Session, stream: bool) -> Result<()> {
    println!("Type your questions below, /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse(&line) {
            Ok(command) => command,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        match command {
            Command::Say(prompt) if prompt.is_empty() => {}
            Command::Say(prompt) => match say(&mut session, &prompt, stream).await {
                Ok(reply) => {
                    if let Some(err) = reply.summarize_error {
                        eprintln!("{}", err.fallback_message());
                    }
                }
                Err(e) => {
                    error!(error = %e, "chat request failed");
                    eprintln!("Error: {e}");
                }
            },
            Command::Personality(personality) => {
                session.update_personality(personality.system_prompt());
                println!("Personality set to {personality}.");
            }
            Command::System(prompt) => {
                session.update_personality(&prompt);
                println!("System prompt updated.");
            }
            Command::Model(model) => {
                session.set_model(model);
                println!("Using {}.", session.model());
            }
            Command::Clear => {
                session.clear_memory();
                println!("Chat memory cleared and ready to start new conversation!");
            }
            Command::Reset => {
                session.clear_all();
                println!("Full history cleared and ready to start new conversation!");
            }
            Command::Save(path) => match std::fs::write(
                &path,
                render_for(&path, session.full_conversation()),
            ) {
                Ok(()) => println!("Saved conversation to {path}."),
                Err(e) => eprintln!("Could not save {path}: {e}"),
            },
            Command::Json(path) => {
                let saved = std::fs::File::create(&path)
                    .map_err(chat::Error::from)
                    .and_then(|file| session.save_json(file));
                match saved {
                    Ok(()) => println!("Saved conversation to {path}."),
                    Err(e) => eprintln!("Could not save {path}: {e}"),
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }

        if session.summarized() {
            eprintln!("{SUMMARIZED_WARNING}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(parse("  hello there "), Ok(Command::Say("hello there".to_string())));
    }

    #[test]
    fn commands_parse_with_arguments() {
        assert_eq!(
            parse("/personality expert"),
            Ok(Command::Personality(Personality::Expert))
        );
        assert_eq!(
            parse("/model  anthropic/claude-3-haiku"),
            Ok(Command::Model("anthropic/claude-3-haiku".to_string()))
        );
        assert_eq!(
            parse("/system Be terse."),
            Ok(Command::System("Be terse.".to_string()))
        );
        assert_eq!(parse("/reset"), Ok(Command::Reset));
        assert_eq!(parse("/exit"), Ok(Command::Quit));
    }

    struct Broken {
        writes: usize,
    }

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn chunk_writer_keeps_output() {
        let mut writer = ChunkWriter::new(Vec::new());
        writer.write("Hel");
        writer.write("lo");

        assert_eq!(writer.out, b"Hello");
        assert!(writer.finish().is_ok());
    }

    #[test]
    fn chunk_writer_reports_first_failure() {
        let mut writer = ChunkWriter::new(Broken { writes: 0 });
        writer.write("one");
        writer.write("two");

        assert_eq!(writer.out.writes, 1);
        let err = writer.finish().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn save_picks_format_from_extension() {
        let turns = [
            Turn::user("Compare"),
            Turn::assistant("Here:\n\n| a | b |\n|---|---|\n| 1 | 2 |"),
        ];

        let html = render_for("chat.html", &turns);
        let markdown = render_for("chat.md", &turns);

        assert!(html.starts_with("<p>👩‍⚕️: Compare</p>"));
        assert!(html.contains("<table>"));
        assert!(markdown.starts_with("👩‍⚕️: Compare\n\n🤓: Here:\n\n| a | b |"));
        assert!(!markdown.contains("<table>"));
    }

    #[test]
    fn bad_commands_are_reported() {
        assert_eq!(parse("/model"), Err("/model needs an argument".to_string()));
        assert!(parse("/personality pirate").is_err());
        assert!(parse("/dance").is_err());
    }
}
