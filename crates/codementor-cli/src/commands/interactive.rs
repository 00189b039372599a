//! Interactive session over a single loaded model.

use codementor_ai::{Assistant, Mode, UserLevel, DEFAULT_LANGUAGE};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::assist::unavailable;
use super::assistant;

pub(crate) async fn run() -> miette::Result<()> {
    let assistant = assistant()?;

    println!("=== CodeMentor ===");
    println!("Type your questions. Enter 'exit' or press Ctrl+D to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(mode) = ask(&mut lines, "Mode (mentor/code/generate): ").await? else {
            break;
        };
        if mode == "exit" || mode == "quit" {
            break;
        }
        let Some(mode) = parse_mode(&mode) else {
            println!("Unknown mode '{}'. Use mentor, code or generate.\n", mode);
            continue;
        };

        let Some(language) = ask(&mut lines, "Language (python/javascript/java/c++/c): ").await?
        else {
            break;
        };
        let language = if language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language
        };

        let Some(question) = ask(&mut lines, "Your question: ").await? else {
            break;
        };

        let text = answer(&assistant, mode, &language, &question).await?;
        println!("\n--- Response ---");
        println!("{}", text);
        println!("\n============================\n");
    }

    println!("\nExiting assistant...");
    Ok(())
}

async fn answer(
    assistant: &Assistant,
    mode: Mode,
    language: &str,
    question: &str,
) -> miette::Result<String> {
    let artifact = match mode {
        Mode::Explain => {
            assistant
                .explain("explain", language, question, "local", UserLevel::default())
                .await
        }
        Mode::RegenerateCode => {
            assistant
                .regenerate_code(question, language, "", "local")
                .await
        }
        _ => assistant.generate(question, language).await,
    }
    .map_err(unavailable)?;
    Ok(artifact.text)
}

/// Map the session's mode words onto assistant modes.
fn parse_mode(input: &str) -> Option<Mode> {
    match input {
        "mentor" | "explain" => Some(Mode::Explain),
        "code" | "regenerate" => Some(Mode::RegenerateCode),
        "generate" => Some(Mode::Generate),
        _ => None,
    }
}

/// Prompt and read one trimmed line. `None` at end of input.
async fn ask(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> miette::Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout()
        .flush()
        .map_err(|e| miette::miette!("Failed to write prompt: {}", e))?;

    let line = lines
        .next_line()
        .await
        .map_err(|e| miette::miette!("Failed to read input: {}", e))?;
    Ok(line.map(|l| l.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("mentor"), Some(Mode::Explain));
        assert_eq!(parse_mode("code"), Some(Mode::RegenerateCode));
        assert_eq!(parse_mode("generate"), Some(Mode::Generate));
        assert_eq!(parse_mode("autocomplete"), None);
    }
}
