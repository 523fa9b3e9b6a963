//! Fixed prompts used by the agent loop.

use chrono::NaiveDate;

/// System instructions; `{date}` is replaced with the run's date.
pub const SYSTEM_PROMPT_TEMPLATE: &str = "\
You are a helpful research assistant with access to web search.
Keep in mind that:
    - Do not be overly confident in your own knowledge. Searching can provide a broader perspective and help validate existing knowledge.
    - In your response, you should try to refer to the materials you found as much as possible. Also add urls for references.
    - If you have enough information, you should answer the question directly instead of searching again.

Today is {date}
";

/// Appended as a user turn once the hop budget is spent.
pub const FORCED_FINAL_INSTRUCTION: &str =
    "Please provide your answer to the original query based on all the information gathered so far.";

/// Render the system prompt for `date` (formatted `%Y-%m-%d`).
pub fn system_prompt(date: NaiveDate) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{date}", &date.format("%Y-%m-%d").to_string())
}

/// The system prompt for today's local date.
pub fn system_prompt_for_today() -> String {
    system_prompt(chrono::Local::now().date_naive())
}
