use std::io::{self, BufRead, Write};

use biokey_core::platform::{AuthOutcome, AuthRequest, PresenceVerifier};

/// Asks on the terminal before every private-key use.
pub struct ConsoleVerifier {
    assume_yes: bool,
}

impl ConsoleVerifier {
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl PresenceVerifier for ConsoleVerifier {
    fn verify(&self, request: &AuthRequest) -> AuthOutcome {
        let prompt = &request.prompt;
        eprintln!("{}", prompt.title);
        eprintln!("{}", prompt.subtitle);
        if let Some(description) = &prompt.description {
            eprintln!("{description}");
        }

        if self.assume_yes {
            tracing::info!(alias = %request.key_alias, "presence approved with --yes");
            return AuthOutcome::Succeeded;
        }

        eprint!(
            "Approve use of key '{}'? [y/N] ({} = N): ",
            request.key_alias, prompt.negative_button_text
        );
        let _ = io::stderr().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => AuthOutcome::Canceled {
                reason: "no answer on standard input".to_string(),
            },
            Ok(_) => parse_answer(&line, &prompt.negative_button_text),
            Err(e) => AuthOutcome::Unavailable {
                reason: format!("cannot read from the console: {e}"),
            },
        }
    }
}

fn parse_answer(line: &str, negative_button_text: &str) -> AuthOutcome {
    let answer = line.trim();
    if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        AuthOutcome::Succeeded
    } else {
        AuthOutcome::Canceled {
            reason: format!("{negative_button_text} selected"),
        }
    }
}
