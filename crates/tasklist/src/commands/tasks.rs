//! Tasks command - list, add, complete and delete your tasks.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};

use tasklist_client::{Error as ClientError, Task, TasklistClient};

use super::Context;

/// Arguments for the tasks command.
#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Bearer token for the backend (direct mode)
    #[arg(long, env = "TASKLIST_TOKEN", global = true)]
    pub token: Option<String>,

    /// Session cookie value issued by the bridge (bridge mode)
    #[arg(long, env = "TASKLIST_SESSION", global = true)]
    pub session: Option<String>,

    /// Session cookie name
    #[arg(long, default_value = "tasklist-session", global = true)]
    pub cookie_name: String,

    #[command(subcommand)]
    pub command: Option<TasksCommand>,
}

#[derive(Subcommand, Debug)]
pub enum TasksCommand {
    /// List your tasks, newest first (default)
    List,

    /// Add a task
    Add {
        /// Task text
        text: String,
    },

    /// Mark a task as completed
    Done {
        /// Task ID
        id: String,
    },

    /// Mark a task as not completed
    Undo {
        /// Task ID
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },
}

/// Run the tasks command.
pub async fn run(args: TasksArgs, ctx: &Context) -> Result<()> {
    let client = build_client(&args, ctx)?;

    match args.command.unwrap_or(TasksCommand::List) {
        TasksCommand::List => match client.tasks().list().await {
            Ok(tasks) => print_list(&tasks, ctx)?,
            Err(e) => report("load your tasks", &e),
        },
        TasksCommand::Add { text } => match client.tasks().create(&text).await {
            Ok(task) => print_task("Added", &task, ctx)?,
            Err(e) => report("add the task", &e),
        },
        TasksCommand::Done { id } => match client.tasks().set_completed(&id, true).await {
            Ok(task) => print_task("Completed", &task, ctx)?,
            Err(e) => report("update the task", &e),
        },
        TasksCommand::Undo { id } => match client.tasks().set_completed(&id, false).await {
            Ok(task) => print_task("Reopened", &task, ctx)?,
            Err(e) => report("update the task", &e),
        },
        TasksCommand::Rm { id } => match client.tasks().delete(&id).await {
            Ok(()) => {
                if ctx.json_output {
                    println!("{}", serde_json::json!({ "deleted": id }));
                } else {
                    let green = Style::new().green();
                    println!("{} Deleted {}", green.apply_to("✓"), style(&id).dim());
                }
            }
            Err(e) => report("delete the task", &e),
        },
    }

    Ok(())
}

fn build_client(args: &TasksArgs, ctx: &Context) -> Result<TasklistClient> {
    let mut builder = TasklistClient::builder().base_url(&ctx.server_url);
    if let Some(ref session) = args.session {
        builder = builder.session_cookie(&args.cookie_name, session);
    } else if let Some(ref token) = args.token {
        builder = builder.bearer_token(token);
    }
    Ok(builder.build()?)
}

fn print_list(tasks: &[Task], ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(tasks)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Tasks").bold());
    println!("{}", dim.apply_to("─".repeat(50)));

    if tasks.is_empty() {
        println!("{}", dim.apply_to("No tasks yet"));
        return Ok(());
    }

    for task in tasks {
        println!("{}", task_line(task));
        if ctx.verbose {
            println!(
                "    {}",
                dim.apply_to(format!(
                    "{} · {}",
                    task.id,
                    task.created_at.format("%Y-%m-%d %H:%M")
                ))
            );
        }
    }
    Ok(())
}

fn print_task(verb: &str, task: &Task, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        let green = Style::new().green();
        println!(
            "{} {}: {} {}",
            green.apply_to("✓"),
            verb,
            task.text,
            style(format!("[{}]", task.id)).dim()
        );
    }
    Ok(())
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let text = if task.completed {
        style(task.text.as_str()).strikethrough().dim().to_string()
    } else {
        task.text.clone()
    };
    format!("{} {}", mark, text)
}

/// One short line per failed action.
fn report(action: &str, err: &ClientError) {
    let red = Style::new().red();
    eprintln!("{} Could not {}: {}", red.apply_to("Error:"), action, failure_reason(err));
}

fn failure_reason(err: &ClientError) -> String {
    match err {
        e if e.is_unreachable() => "the server is not reachable".to_string(),
        e if e.is_auth_error() => "you are not signed in or your session expired".to_string(),
        e if e.is_not_found() => "no such task".to_string(),
        ClientError::Api { message, .. } if err.is_validation_error() => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str, message: &str) -> ClientError {
        ClientError::Api {
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_failure_reasons() {
        assert_eq!(
            failure_reason(&api(401, "unauthorized", "Missing token")),
            "you are not signed in or your session expired"
        );
        assert_eq!(failure_reason(&api(404, "not_found", "x")), "no such task");
        assert_eq!(
            failure_reason(&api(400, "validation_error", "text must not be empty")),
            "text must not be empty"
        );
    }

    #[test]
    fn test_task_line_marks_completion() {
        let mut task: Task = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "text": "buy milk",
            "completed": false,
            "created_at": "2024-01-01T00:00:00Z",
            "owner_id": "u1"
        }))
        .unwrap();
        assert_eq!(task_line(&task), "[ ] buy milk");

        task.completed = true;
        assert!(task_line(&task).starts_with("[x] "));
    }
}
