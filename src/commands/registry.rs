use super::CommandResult;
use crate::ui::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

impl<'a> CommandInvocation<'a> {
    pub fn words(&self) -> Vec<&'a str> {
        self.args.split_whitespace().collect()
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Commands whose name starts with `prefix`, for tab completion.
pub fn matching_commands(prefix: &str) -> Vec<&'static Command> {
    let prefix = prefix.to_ascii_lowercase();
    all_commands()
        .iter()
        .filter(|command| command.name.starts_with(&prefix))
        .collect()
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands and key bindings.",
        handler: super::handle_help,
    },
    Command {
        name: "new",
        usage: "/new [title]",
        help: "Create a new chat session and switch to it.",
        handler: super::handle_new,
    },
    Command {
        name: "sessions",
        usage: "/sessions",
        help: "List sessions; pick one with /select.",
        handler: super::handle_sessions,
    },
    Command {
        name: "select",
        usage: "/select <n|id>",
        help: "Switch to a session by list position or id.",
        handler: super::handle_select,
    },
    Command {
        name: "delete",
        usage: "/delete [n|id]",
        help: "Delete a session (the current one by default).",
        handler: super::handle_delete,
    },
    Command {
        name: "feature",
        usage: "/feature <name>",
        help: "Switch the feature thread (chat, questions, qa, research, quiz, ...).",
        handler: super::handle_feature,
    },
    Command {
        name: "upload",
        usage: "/upload <path.pdf>",
        help: "Upload a PDF into the current session.",
        handler: super::handle_upload,
    },
    Command {
        name: "questions",
        usage: "/questions [faq|mcq|true_false|mixed] [chapter]",
        help: "Generate study questions from the PDF.",
        handler: super::handle_questions,
    },
    Command {
        name: "quiz",
        usage: "/quiz [type] [easy|medium|hard] [count]",
        help: "Generate a quiz from the PDF.",
        handler: super::handle_quiz,
    },
    Command {
        name: "qa",
        usage: "/qa",
        help: "Generate question and answer pairs from the PDF.",
        handler: super::handle_qa,
    },
    Command {
        name: "research",
        usage: "/research [summary|analysis|...]",
        help: "Run a research pass over the PDF.",
        handler: super::handle_research,
    },
    Command {
        name: "model",
        usage: "/model [id|name|n]",
        help: "List models or choose the model for new requests.",
        handler: super::handle_model,
    },
    Command {
        name: "search",
        usage: "/search <query>",
        help: "Search PDFs and conversations across sessions.",
        handler: super::handle_search,
    },
    Command {
        name: "health",
        usage: "/health",
        help: "Show backend system health.",
        handler: super::handle_health,
    },
    Command {
        name: "voice",
        usage: "/voice",
        help: "Start or stop voice input.",
        handler: super::handle_voice,
    },
    Command {
        name: "export",
        usage: "/export [file]",
        help: "Write the visible conversation to a text file.",
        handler: super::handle_export,
    },
    Command {
        name: "markdown",
        usage: "/markdown",
        help: "Toggle markdown rendering for assistant replies.",
        handler: super::handle_markdown,
    },
    Command {
        name: "home",
        usage: "/home",
        help: "Return to the landing screen.",
        handler: super::handle_home,
    },
    Command {
        name: "login",
        usage: "/login [email] [password]",
        help: "Sign in to the backend.",
        handler: super::handle_login,
    },
    Command {
        name: "register",
        usage: "/register [email] [password]",
        help: "Create an account on the backend.",
        handler: super::handle_register,
    },
    Command {
        name: "logout",
        usage: "/logout",
        help: "Forget the stored access token.",
        handler: super::handle_logout,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Exit chatpdf.",
        handler: super::handle_quit,
    },
];
