//! Prompt engineering for the local code model.

use crate::mode::{GenerationRequest, Mode, UserLevel};

/// Marker after which the model continues existing code.
pub const CONTINUE_MARKER: &str = "# CONTINUE:";

/// Instructions appended to every mentor prompt.
const MENTOR_INSTRUCTIONS: &str = "- Explain what the code does.
- Provide up to 3 numbered steps (Step 1:, Step 2:, Step 3:).
- End with ONE limitation (Limitation: ...).
- Describe only what appears in the code, do not invent structures.
- Suggest improvements or alternatives.
- Include validation or error handling if relevant.
- Do not use Markdown, headers, or comments.
- Do not repeat the code or the prompt.
- Keep the tone friendly and concise.
";

/// Instructions appended to every code-only prompt.
const CODE_ONLY_INSTRUCTIONS: &str = "# Output:
# ONLY return valid code in the specified language.
# Use the function name exactly as given in the prompt.
# No explanations, no comments, no metadata.
# End strictly with '# END'.
";

/// Build the prompt for a request according to its mode.
pub fn build(request: &GenerationRequest) -> String {
    match request.mode {
        Mode::Generate => build_generate_prompt(&request.task, &request.language),
        Mode::Autocomplete => build_autocomplete_prompt(request.code(), &request.language),
        Mode::Explain => build_mentor_prompt(request.code(), &request.language, request.level()),
        Mode::RegenerateCode => {
            build_code_only_prompt(&request.task, &request.language, request.code())
        }
    }
}

/// Two header lines: language and task.
pub fn build_generate_prompt(task: &str, language: &str) -> String {
    format!("# Language: {language}\n# Task: {task}\n")
}

/// Existing code followed by the continuation marker.
pub fn build_autocomplete_prompt(code: &str, language: &str) -> String {
    format!("# Language: {language}\n{code}\n{CONTINUE_MARKER}\n")
}

/// Mentor explanation prompt for a developer of the given level.
pub fn build_mentor_prompt(code: &str, language: &str, level: UserLevel) -> String {
    format!(
        "Explain the following {language} code clearly to a {level} developer.\n\n\
         {code}\n\n{MENTOR_INSTRUCTIONS}"
    )
}

/// Code-only prompt; the model must end with the `# END` marker line.
pub fn build_code_only_prompt(task: &str, language: &str, code: &str) -> String {
    format!(
        "You are a code generator.\n# Language: {language}\n# Task: {task}\n\
         # Existing code:\n{code}\n\n{CODE_ONLY_INSTRUCTIONS}"
    )
}
