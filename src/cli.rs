use crate::{
    activity::ActivityLog,
    app::{App, Tab, MSG_ADMIN_ONLY, MSG_REGISTERED},
    error::{Error, Result},
    model::{RegistrationForm, User},
    transport::Transport,
    Args,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;

pub struct Context<T: Transport> {
    pub args: Args,
    pub run_id: String,
    pub base_url: String,
    pub store_desc: String,
    pub history_file: Option<PathBuf>,
    pub app: RefCell<App<T>>,
    pub activity: Option<RefCell<ActivityLog>>,
}

fn verbose<T: Transport>(ctx: &Context<T>, message: &str) {
    if ctx.args.verbose || ctx.args.debug {
        eprintln!("[VERBOSE] {}", message);
    }
}

fn log_action<T: Transport>(
    ctx: &Context<T>,
    action: &str,
    target: Option<&str>,
    error: Option<&Error>,
) {
    if let Some(activity) = &ctx.activity {
        let kind = error.map(|e| e.kind());
        let message = error.map(|e| e.to_string());
        if let Err(e) = activity
            .borrow_mut()
            .action(action, target, kind, message.as_deref())
        {
            verbose(ctx, &format!("activity log write failed: {}", e));
        }
    }
}

fn log_session<T: Transport>(ctx: &Context<T>, username: Option<&str>) {
    if let Some(activity) = &ctx.activity {
        let _ = activity.borrow_mut().session_change(username);
    }
}

/// Print the failure of an action, record the outcome, and hand back the
/// value on success. Nothing propagates past this point.
fn report<T: Transport, V>(
    ctx: &Context<T>,
    action: &str,
    target: Option<&str>,
    result: Result<V>,
) -> Option<V> {
    match result {
        Ok(v) => {
            log_action(ctx, action, target, None);
            Some(v)
        }
        Err(e) => {
            if let Error::Connection { detail } = &e {
                verbose(ctx, &format!("{} failed: {}", action, detail));
            }
            println!("Error: {}", e);
            log_action(ctx, action, target, Some(&e));
            None
        }
    }
}

/// Ask a yes/no question on stdin; `--yes` answers for the user
fn confirm<T: Transport>(ctx: &Context<T>, question: &str) -> bool {
    if ctx.args.yes {
        return true;
    }
    print!("{} [y/N]: ", question);
    io::stdout().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        input == "y" || input == "yes"
    } else {
        false
    }
}

fn prompt_line(label: &str) -> Option<String> {
    print!("{}", label);
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin().read_line(&mut input).ok()?;
    Some(input.trim_end_matches(['\r', '\n']).to_string())
}

pub fn run_once<T: Transport>(ctx: &Context<T>, command: &str) -> anyhow::Result<()> {
    let line = command.trim();
    if line.starts_with('/') {
        handle_command(ctx, line);
    } else {
        handle_command(ctx, &format!("/{}", line));
    }
    Ok(())
}

pub fn run_repl<T: Transport>(ctx: Context<T>) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    if let Some(history) = &ctx.history_file {
        if rl.load_history(history).is_err() {
            verbose(&ctx, &format!("no history at {}", history.display()));
        }
    }

    println!("userdesk - type /help for commands, /exit to quit");
    print_status(&ctx);

    loop {
        match rl.readline(&prompt(&ctx)) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !line.starts_with("/login") && !line.starts_with("/register") {
                    rl.add_history_entry(line)?;
                }

                if handle_command(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(history) = &ctx.history_file {
        if let Some(parent) = history.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        if let Err(e) = rl.save_history(history) {
            verbose(&ctx, &format!("failed to save history: {}", e));
        }
    }

    Ok(())
}

fn prompt<T: Transport>(ctx: &Context<T>) -> String {
    let app = ctx.app.borrow();
    match app.current_user() {
        Some(user) => format!("{}@{}> ", user.username, app.tab().as_str()),
        None => "> ".to_string(),
    }
}

fn print_status<T: Transport>(ctx: &Context<T>) {
    match ctx.app.borrow().current_user() {
        Some(user) => println!("Logged in as {} ({})", user.username, user.role),
        None => println!("Not logged in. Use /login or /register."),
    }
}

/// Run one slash command. Returns true when the REPL should exit.
pub fn handle_command<T: Transport>(ctx: &Context<T>, line: &str) -> bool {
    let (cmd, rest) = match line.split_once(' ') {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };
    let args = match shell_words::split(rest) {
        Ok(a) => a,
        Err(e) => {
            println!("Invalid arguments: {}", e);
            return false;
        }
    };

    match cmd {
        "/exit" | "/quit" => return true,
        "/help" => print_help(),
        "/session" => {
            println!("Run: {}", ctx.run_id);
            println!("Backend: {}", ctx.base_url);
            println!("Session store: {}", ctx.store_desc);
            if let Some(activity) = &ctx.activity {
                println!("Activity log: {:?}", activity.borrow().path);
            }
            print_status(ctx);
        }
        "/whoami" => print_status(ctx),
        "/health" => {
            let result = ctx.app.borrow().health();
            if let Some(h) = report(ctx, "health", None, result) {
                println!("Backend: {} (database: {})", h.status, h.database);
            }
        }
        "/login" => cmd_login(ctx, &args),
        "/register" => cmd_register(ctx, &args),
        "/logout" => {
            let result = ctx.app.borrow_mut().logout();
            if report(ctx, "logout", None, result).is_some() {
                log_session(ctx, None);
                println!("Logged out");
            }
        }
        "/tab" => cmd_tab(ctx, &args),
        "/users" => {
            let result = ctx.app.borrow_mut().reload_users().map(|u| u.to_vec());
            if let Some(users) = report(ctx, "list_users", None, result) {
                print_users(ctx, &users.iter().collect::<Vec<_>>(), users.len());
            }
        }
        "/filter" => {
            let query = args.join(" ");
            let app = ctx.app.borrow();
            if !app.is_admin() {
                println!("{}", MSG_ADMIN_ONLY);
            } else {
                let total = app.table().users().len();
                let rows = app.table().filtered(&query);
                let rows: Vec<User> = rows.into_iter().cloned().collect();
                drop(app);
                print_users(ctx, &rows.iter().collect::<Vec<_>>(), total);
            }
        }
        "/search" => {
            if args.is_empty() {
                println!("Usage: /search <query>");
            } else {
                let query = args.join(" ");
                let result = ctx.app.borrow().search(&query);
                if let Some(users) = report(ctx, "search", Some(query.as_str()), result) {
                    print_users(ctx, &users.iter().collect::<Vec<_>>(), users.len());
                }
            }
        }
        "/edit" => match parse_id(&args) {
            Some(id) => {
                let result = ctx.app.borrow_mut().start_edit(id).map(|d| d.clone());
                if let Some(draft) = report(ctx, "edit", Some(id.to_string().as_str()), result) {
                    println!(
                        "Editing user {}: username={} email={} role={}",
                        id, draft.username, draft.email, draft.role
                    );
                    println!(
                        "Use /set <username|email|password|role> <value>, then /save or /cancel"
                    );
                }
            }
            None => println!("Usage: /edit <id>"),
        },
        "/set" => {
            if args.len() < 2 {
                println!("Usage: /set <username|email|password|role> <value>");
            } else {
                let value = args[1..].join(" ");
                let result = ctx.app.borrow_mut().set_field(&args[0], &value);
                report(ctx, "set_field", Some(args[0].as_str()), result);
            }
        }
        "/save" => {
            let result = ctx.app.borrow_mut().save_edit();
            if let Some(id) = report(ctx, "update_user", None, result) {
                println!("User {} updated", id);
                reload_and_print(ctx);
            }
        }
        "/cancel" => {
            ctx.app.borrow_mut().cancel_edit();
            println!("Edit cancelled");
        }
        "/delete" => match parse_id(&args) {
            Some(id) => {
                let target = id.to_string();
                let gate = ctx.app.borrow().check_admin();
                if report(ctx, "delete_user", Some(target.as_str()), gate).is_none() {
                    return false;
                }
                if !confirm(ctx, "Are you sure you want to delete this user?") {
                    println!("Cancelled");
                } else {
                    let result = ctx.app.borrow_mut().delete_user(id);
                    if report(ctx, "delete_user", Some(target.as_str()), result).is_some() {
                        println!("User deleted");
                        reload_and_print(ctx);
                    }
                }
            }
            None => println!("Usage: /delete <id>"),
        },
        "/stats" => {
            let result = ctx.app.borrow().stats();
            if let Some(stats) = report(ctx, "stats", None, result) {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&stats).unwrap_or_else(|_| stats.to_string())
                );
            }
        }
        _ => println!("Unknown command: {}. Type /help for commands.", cmd),
    }
    false
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                    - quit");
    println!("  /help                    - show commands");
    println!("  /session                 - show run and session info");
    println!("  /whoami                  - show the logged-in user");
    println!("  /health                  - check the backend");
    println!("Account:");
    println!("  /login <user> [password] - log in (prompts for the password if omitted)");
    println!("  /register <user> <email> <password> <confirm>");
    println!("  /logout                  - clear the session");
    println!("Navigation:");
    println!("  /tab [home|about|gallery|support|users]");
    println!("Users (admin):");
    println!("  /users                   - reload the user table");
    println!("  /filter [query]          - filter loaded rows by name, email or id");
    println!("  /search <query>          - search on the server");
    println!("  /edit <id>               - start editing a row");
    println!("  /set <field> <value>     - change username, email, password or role");
    println!("  /save | /cancel          - finish the edit");
    println!("  /delete <id>             - delete a user");
    println!("  /stats                   - show server statistics");
}

fn cmd_login<T: Transport>(ctx: &Context<T>, args: &[String]) {
    let username = args.first().cloned().unwrap_or_default();
    let password = match args.get(1) {
        Some(p) => p.clone(),
        None if !username.trim().is_empty() => prompt_line("Password: ").unwrap_or_default(),
        None => String::new(),
    };

    let result = ctx.app.borrow_mut().login(&username, &password);
    if let Some(user) = report(ctx, "login", Some(username.as_str()), result) {
        log_session(ctx, Some(&user.username));
        println!("Logged in as {} ({})", user.username, user.role);
        println!("{}", Tab::Home.text(&user));
    }
}

fn cmd_register<T: Transport>(ctx: &Context<T>, args: &[String]) {
    let field = |i: usize| args.get(i).cloned().unwrap_or_default();
    let form = RegistrationForm {
        username: field(0),
        email: field(1),
        password: field(2),
        confirm_password: field(3),
    };
    let target = form.username.trim().to_string();
    let result = ctx.app.borrow_mut().register(&form);
    if report(ctx, "register", Some(target.as_str()), result).is_some() {
        println!("{}", MSG_REGISTERED);
    }
}

fn cmd_tab<T: Transport>(ctx: &Context<T>, args: &[String]) {
    let Some(name) = args.first() else {
        let current = ctx.app.borrow().tab();
        for tab in Tab::ALL {
            let marker = if tab == current { " *" } else { "" };
            println!("  {}{}", tab.as_str(), marker);
        }
        return;
    };
    let Some(tab) = Tab::from_str(name) else {
        println!("Unknown tab: {}. Use home, about, gallery, support or users.", name);
        return;
    };

    let result = ctx.app.borrow_mut().open_tab(tab);
    if report(ctx, "open_tab", Some(tab.as_str()), result).is_none() {
        return;
    }

    let app = ctx.app.borrow();
    let Some(user) = app.current_user() else {
        return;
    };
    if tab != Tab::Users {
        println!("{}", tab.text(&user));
    } else if !user.is_admin() {
        println!("{}", MSG_ADMIN_ONLY);
    } else {
        let users: Vec<User> = app.table().users().to_vec();
        drop(app);
        print_users(ctx, &users.iter().collect::<Vec<_>>(), users.len());
    }
}

fn reload_and_print<T: Transport>(ctx: &Context<T>) {
    let result = ctx.app.borrow_mut().reload_users().map(|u| u.to_vec());
    if let Some(users) = report(ctx, "list_users", None, result) {
        print_users(ctx, &users.iter().collect::<Vec<_>>(), users.len());
    }
}

fn parse_id(args: &[String]) -> Option<i64> {
    args.first().and_then(|a| a.parse().ok())
}

fn print_users<T: Transport>(ctx: &Context<T>, rows: &[&User], total: usize) {
    if total == 0 {
        println!("No users found.");
        return;
    }
    if rows.len() == total {
        println!("Users: {}", total);
    } else {
        println!("Users: {} (filtered: {})", total, rows.len());
    }

    let app = ctx.app.borrow();
    let editing = app.table().editing();
    println!(
        "{:<6} {:<16} {:<28} {:<6} {:<20} {:<20}",
        "ID", "Username", "Email", "Role", "Created", "Updated"
    );
    for user in rows {
        let (username, email, role, marker) = match editing {
            Some((id, draft)) if id == user.id => (
                draft.username.as_str(),
                draft.email.as_str(),
                draft.role.as_str(),
                " (editing)",
            ),
            _ => (
                user.username.as_str(),
                user.email_or_empty(),
                user.role.as_str(),
                "",
            ),
        };
        println!(
            "{:<6} {:<16} {:<28} {:<6} {:<20} {:<20}{}",
            user.id,
            username,
            email,
            role,
            user.created_at.as_deref().unwrap_or("-"),
            user.updated_at.as_deref().unwrap_or("-"),
            marker
        );
    }
}
