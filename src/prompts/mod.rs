//! Prompt assembly for planning, humanization, and direct execution.

use crate::tools::ToolDefinition;

/// Marker that introduces the request at the end of every assembled prompt.
/// Retrieval collaborators must embed it so memory context can be spliced
/// in front of the request.
pub const USER_REQUEST_MARKER: &str = "User request:";

/// Prompt for the single planning call.
pub fn planning_prompt(
    message: &str,
    tools: &[ToolDefinition],
    memory_context: &str,
    system_prompt: &str,
) -> String {
    let mut prompt = String::new();

    if !system_prompt.is_empty() {
        prompt.push_str(system_prompt);
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "You are a task planner. Break the user's request into invocations of the available tools.\n\nAvailable tools:\n",
    );
    for tool in tools {
        prompt.push_str(&format!(
            "- {}: {}\n  parameters schema: {}\n",
            tool.name, tool.description, tool.params_schema
        ));
        if let Some(result_schema) = &tool.result_schema {
            prompt.push_str(&format!("  result schema: {}\n", result_schema));
        }
    }
    prompt.push('\n');

    if !memory_context.is_empty() {
        prompt.push_str("Conversation context:\n");
        prompt.push_str(memory_context);
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "Respond ONLY with a JSON array of step objects. Each step object has the keys \
         \"id\", \"toolName\", \"params\", and \"dependsOn\".\n\
         - \"id\": a short identifier, unique within the plan.\n\
         - \"toolName\": the name of one available tool.\n\
         - \"params\": the parameters object for that tool. To use the result of an \
         earlier step, write \"{{stepId}}\" for the whole result or \"{{stepId.property}}\" \
         for one field of it.\n\
         - \"dependsOn\": the ids of steps whose results this step uses.\n\n",
    );

    prompt.push_str(USER_REQUEST_MARKER);
    prompt.push(' ');
    prompt.push_str(message);
    prompt
}

/// Basic prompt when no retrieval collaborator is configured.
pub fn basic_prompt(system_prompt: &str, memory_context: &str, message: &str) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if !system_prompt.is_empty() {
        parts.push(system_prompt);
    }
    if !memory_context.is_empty() {
        parts.push(memory_context);
    }

    let request = format!("{} {}", USER_REQUEST_MARKER, message);
    let mut prompt = parts.join("\n\n");
    if !prompt.is_empty() {
        prompt.push_str("\n\n");
    }
    prompt.push_str(&request);
    prompt
}

/// Splice memory context in front of the user-request marker of an
/// augmented prompt. Falls back to prepending when the marker is absent.
pub fn splice_memory(prompt: &str, memory_context: &str) -> String {
    if memory_context.is_empty() {
        return prompt.to_string();
    }

    match prompt.rfind(USER_REQUEST_MARKER) {
        Some(position) => format!(
            "{}{}\n\n{}",
            &prompt[..position],
            memory_context,
            &prompt[position..]
        ),
        None => format!("{}\n\n{}", memory_context, prompt),
    }
}

/// Prompt turning a raw step trace into a conversational answer.
pub fn humanize_prompt(message: &str, trace: &str) -> String {
    format!(
        "The user asked: {message}\n\n\
         Tools were executed to answer the request. Results, one per line as \"stepId: result\":\n\
         {trace}\n\n\
         Write a natural, conversational answer to the user's request based on these results. \
         Do not mention step ids or internal details."
    )
}
