use sheet_returns::workflows::returns::matcher::{ChoicePicker, PickError};
use std::io::{self, BufRead, Write};

/// Blocking prompt for the sheet number when `--sheet` is omitted.
pub(crate) fn prompt_sheet_number() -> io::Result<String> {
    print!("Please enter the sheet number: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Interactive decision-maker for ambiguous surnames. Re-prompts until the
/// input parses as an index within the presented range, so the matcher never
/// sees an out-of-range choice from this surface.
#[derive(Debug)]
pub(crate) struct ConsolePicker;

impl ChoicePicker for ConsolePicker {
    fn pick(&mut self, surname: &str, options: &[&str]) -> Result<usize, PickError> {
        pick_from(&mut io::stdin().lock(), surname, options)
    }
}

fn render_prompt(surname: &str, options: &[&str]) -> String {
    let mut prompt = format!("There are {} entries for '{}'.\n", options.len(), surname);
    for (idx, option) in options.iter().enumerate() {
        if idx == 0 {
            prompt.push_str(&format!("Do you mean {} [0]", option));
        } else {
            prompt.push_str(&format!(" or {} [{}]", option, idx));
        }
    }
    prompt.push_str("? ");
    prompt
}

fn pick_from<R: BufRead>(
    input: &mut R,
    surname: &str,
    options: &[&str],
) -> Result<usize, PickError> {
    let prompt = render_prompt(surname, options);
    loop {
        print!("{prompt}");
        io::stdout().flush().map_err(PickError::Input)?;

        let mut line = String::new();
        let read = input.read_line(&mut line).map_err(PickError::Input)?;
        if read == 0 {
            // input closed mid-prompt
            return Err(PickError::Exhausted {
                surname: surname.to_string(),
            });
        }

        match line.trim().parse::<usize>() {
            Ok(choice) if choice < options.len() => return Ok(choice),
            _ => println!(
                "Please enter a number between 0 and {}.",
                options.len() - 1
            ),
        }
    }
}
