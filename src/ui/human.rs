use std::io::{BufRead, Write};

use crate::ai::Agent;
use crate::error::AgentError;
use crate::game::{Action, GameState, Seat};

/// Seats played from a line-oriented terminal: the player types the piece
/// number (1-4) to move. One agent may serve several seats.
pub struct HumanAgent<R: BufRead, W: Write> {
    name: String,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> HumanAgent<R, W> {
    pub fn new(name: impl Into<String>, input: R, output: W) -> Self {
        HumanAgent {
            name: name.into(),
            input,
            output,
        }
    }

    fn prompt(&mut self, seat: Seat, legal: &[Action]) -> Result<(), AgentError> {
        let choices = legal
            .iter()
            .filter_map(|a| a.piece())
            .map(|p| (p + 1).to_string())
            .collect::<Vec<_>>()
            .join("/");
        write!(self.output, "{}, move which piece? [{choices}] ", seat.name())
            .and_then(|_| self.output.flush())
            .map_err(|e| AgentError::Input(e.to_string()))
    }
}

/// Parse a 1-based piece number and check it against `legal`.
pub fn parse_choice(line: &str, legal: &[Action]) -> Option<Action> {
    let number: usize = line.trim().parse().ok()?;
    let action = Action::Move(number.checked_sub(1)?);
    legal.contains(&action).then_some(action)
}

impl<R: BufRead, W: Write> Agent for HumanAgent<R, W> {
    fn select_action(&mut self, state: &GameState, legal: &[Action]) -> Result<Action, AgentError> {
        if legal.is_empty() {
            return Err(AgentError::NoLegalActions);
        }
        // A single option needs no input
        if let [only] = legal {
            return Ok(*only);
        }
        loop {
            self.prompt(state.active_seat(), legal)?;
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|e| AgentError::Input(e.to_string()))?;
            if read == 0 || line.trim().eq_ignore_ascii_case("q") {
                return Err(AgentError::InputClosed);
            }
            match parse_choice(&line, legal) {
                Some(action) => return Ok(action),
                None => {
                    writeln!(self.output, "'{}' is not a legal piece", line.trim())
                        .map_err(|e| AgentError::Input(e.to_string()))?;
                }
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn legal() -> Vec<Action> {
        vec![Action::Move(0), Action::Move(2)]
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1", &legal()), Some(Action::Move(0)));
        assert_eq!(parse_choice(" 3\n", &legal()), Some(Action::Move(2)));
        assert_eq!(parse_choice("2", &legal()), None);
        assert_eq!(parse_choice("0", &legal()), None);
        assert_eq!(parse_choice("x", &legal()), None);
    }

    #[test]
    fn test_reprompts_until_legal() {
        let input = Cursor::new("7\nabc\n3\n");
        let mut human = HumanAgent::new("Human", input, Vec::new());
        let action = human.select_action(&GameState::initial(), &legal()).unwrap();
        assert_eq!(action, Action::Move(2));

        let out = String::from_utf8(human.output).unwrap();
        assert_eq!(out.matches("Red, move which piece? [1/3]").count(), 3);
        assert!(out.contains("'7' is not a legal piece"));
    }

    #[test]
    fn test_eof_and_quit_close_input() {
        let mut human = HumanAgent::new("Human", Cursor::new(""), Vec::new());
        assert_eq!(
            human.select_action(&GameState::initial(), &legal()),
            Err(AgentError::InputClosed)
        );
        let mut human = HumanAgent::new("Human", Cursor::new("Q\n"), Vec::new());
        assert_eq!(
            human.select_action(&GameState::initial(), &legal()),
            Err(AgentError::InputClosed)
        );
    }

    #[test]
    fn test_single_option_needs_no_input() {
        let mut human = HumanAgent::new("Human", Cursor::new(""), Vec::new());
        let action = human
            .select_action(&GameState::initial(), &[Action::Move(1)])
            .unwrap();
        assert_eq!(action, Action::Move(1));
        assert_eq!(human.name(), "Human");
    }
}
