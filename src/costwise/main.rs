use clap::Parser;
use colored::Colorize;
use costwise::clients::ClientRegistry;
use costwise::config::CostwiseConfig;
use costwise::dashboard;
use costwise::error::{CostwiseError, Result};
use costwise::model::{Client, ModuleKind};
use costwise::registry::{DropPosition, ModuleRegistry, NewModule};
use costwise::session::SessionSlots;
use costwise::sidebar::SidebarTree;
use costwise::store::batch::BatchQueue;
use costwise::store::fs::FileStore;
use directories::ProjectDirs;
use serde_json::json;
use std::path::PathBuf;

mod args;
mod cli;
use args::{Cli, Commands};
use cli::print;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }
}

struct AppContext {
    modules: ModuleRegistry<FileStore>,
    clients: ClientRegistry<FileStore>,
    config: CostwiseConfig,
    root: PathBuf,
}

impl AppContext {
    /// Flush-on-unload: the process is about to exit, commit everything.
    fn finish(&mut self) -> Result<()> {
        self.modules.flush()?;
        self.clients.flush()?;
        Ok(())
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut ctx = init_context(&cli)?;

    let outcome = match cli.command {
        Some(Commands::Modules { search, all }) => handle_modules(&mut ctx, search, all),
        Some(Commands::Add {
            name,
            header,
            parent,
            no_client,
        }) => handle_add(&mut ctx, name, header, parent, no_client),
        Some(Commands::Rename { id, name }) => handle_rename(&mut ctx, id, name),
        Some(Commands::Delete { id }) => handle_delete(&mut ctx, id),
        Some(Commands::Move {
            id,
            target,
            position,
        }) => handle_move(&mut ctx, id, target, position),
        Some(Commands::Clients) => handle_clients(&mut ctx),
        Some(Commands::ClientNew { name, address }) => handle_client_new(&mut ctx, name, address),
        Some(Commands::ClientUse { id }) => handle_client_use(&mut ctx, id),
        Some(Commands::ClientShow) => handle_client_show(&mut ctx),
        Some(Commands::ClientClear) => handle_client_clear(&mut ctx),
        Some(Commands::SetCost { module, total }) => handle_set_cost(&mut ctx, module, total),
        Some(Commands::Dashboard) => handle_dashboard(&mut ctx),
        Some(Commands::Config { key, value }) => handle_config(&mut ctx, key, value),
        None => handle_dashboard(&mut ctx),
    };

    // Commit pending writes even when the handler failed part-way: the
    // in-memory mutations that did happen should not be lost.
    let flushed = ctx.finish();
    outcome?;
    flushed
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let root = if cli.global {
        let proj_dirs = ProjectDirs::from("com", "costwise", "costwise")
            .expect("Could not determine data dir");
        proj_dirs.data_dir().to_path_buf()
    } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        cwd.join(".costwise")
    };

    let config = CostwiseConfig::load(&root).unwrap_or_default();
    let session_dir = root.join("session");

    let modules = ModuleRegistry::new(
        BatchQueue::with_limits(
            FileStore::new(root.clone()),
            config.batch_capacity,
            config.batch_idle(),
        ),
        SessionSlots::in_dir(session_dir.clone()),
    );
    let clients = ClientRegistry::with_autosave_interval(
        BatchQueue::with_limits(
            FileStore::new(root.clone()),
            config.batch_capacity,
            config.batch_idle(),
        ),
        SessionSlots::in_dir(session_dir),
        config.autosave_interval(),
    );

    Ok(AppContext {
        modules,
        clients,
        config,
        root,
    })
}

fn handle_modules(ctx: &mut AppContext, search: Option<String>, all: bool) -> Result<()> {
    ctx.modules.load();
    let tree = ctx.modules.get();
    let mut view = SidebarTree::new();
    if all || search.is_some() {
        view.expand_all(&tree);
    }
    let rows = match search {
        Some(query) => view.filter(&tree, &query),
        None => view.rows(&tree),
    };
    print::print_tree(&rows);
    Ok(())
}

fn handle_add(
    ctx: &mut AppContext,
    name: String,
    header: bool,
    parent: Option<String>,
    no_client: bool,
) -> Result<()> {
    ctx.modules.load();
    if let Some(parent) = parent.as_deref() {
        match ctx.modules.module(parent) {
            Some(m) if m.is_header() => {}
            Some(_) => {
                return Err(CostwiseError::Validation(format!(
                    "'{}' is not a header",
                    parent
                )))
            }
            None => return Err(CostwiseError::NotFound(format!("module '{}'", parent))),
        }
    }
    let created = ctx.modules.add(NewModule {
        name,
        kind: if header {
            ModuleKind::Header
        } else {
            ModuleKind::Regular
        },
        parent_id: parent,
        requires_client: !header && !no_client,
    })?;
    println!(
        "{}",
        format!("Module added: {} ({})", created.name, created.id).green()
    );
    Ok(())
}

fn handle_rename(ctx: &mut AppContext, id: String, name: String) -> Result<()> {
    ctx.modules.load();
    ctx.modules.edit(&id, &name)?;
    println!("{}", format!("Module renamed: {}", id).green());
    Ok(())
}

fn handle_delete(ctx: &mut AppContext, id: String) -> Result<()> {
    ctx.modules.load();
    let removed = ctx.modules.delete(&id)?;
    println!(
        "{}",
        format!("Module deleted: {} ({} node(s) removed)", id, removed).green()
    );
    Ok(())
}

fn handle_move(ctx: &mut AppContext, id: String, target: String, position: String) -> Result<()> {
    let position: DropPosition = position.parse()?;
    ctx.modules.load();
    ctx.modules.move_module(&id, &target, position)?;
    println!("{}", format!("Module moved: {}", id).green());
    Ok(())
}

fn handle_clients(ctx: &mut AppContext) -> Result<()> {
    let clients = ctx.clients.load_clients()?;
    let current = ctx.clients.current();
    print::print_clients(&clients, current.as_ref().map(|c| c.id.as_str()));
    Ok(())
}

fn handle_client_new(ctx: &mut AppContext, name: String, address: String) -> Result<()> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(CostwiseError::Validation("Client name cannot be empty".into()));
    }
    let client = Client::new(name, address);
    ctx.clients.save_client(&client)?;
    let id = client.id.clone();
    let name = client.name.clone();
    ctx.clients.set_current(Some(client));
    println!("{}", format!("Client created: {} ({})", name, id).green());
    Ok(())
}

fn handle_client_use(ctx: &mut AppContext, id: String) -> Result<()> {
    let client = ctx
        .clients
        .find_client(&id)?
        .ok_or_else(|| CostwiseError::NotFound(format!("client '{}'", id)))?;
    let name = client.name.clone();
    ctx.clients.set_current(Some(client));
    println!("{}", format!("Current client: {}", name).green());
    Ok(())
}

fn handle_client_show(ctx: &mut AppContext) -> Result<()> {
    match ctx.clients.current() {
        Some(client) => print::print_client(&client),
        None => println!("{}", "No client selected".yellow()),
    }
    Ok(())
}

fn handle_client_clear(ctx: &mut AppContext) -> Result<()> {
    ctx.clients.set_current(None);
    println!("Current client cleared.");
    Ok(())
}

fn handle_set_cost(ctx: &mut AppContext, module: String, total: f64) -> Result<()> {
    ctx.modules.load();
    match ctx.modules.module(&module) {
        Some(m) if m.is_header() => {
            return Err(CostwiseError::Validation(format!(
                "'{}' is a header and holds no cost data",
                module
            )))
        }
        Some(_) => {}
        None => return Err(CostwiseError::NotFound(format!("module '{}'", module))),
    }
    ctx.clients
        .save_module_data(&module, json!({ "totalCost": total }))?;
    println!(
        "{}",
        format!("Cost recorded: {} = {:.2}", module, total).green()
    );
    Ok(())
}

fn handle_dashboard(ctx: &mut AppContext) -> Result<()> {
    ctx.modules.load();
    let client = ctx.clients.current();
    let view = dashboard::render(client.as_ref(), &ctx.modules.get());
    print::print_dashboard(&view);
    Ok(())
}

fn handle_config(ctx: &mut AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    match (key, value) {
        (None, _) => {
            for key in ["batch-capacity", "batch-idle-secs", "autosave-interval-secs"] {
                println!("{} = {}", key, ctx.config.get(key)?);
            }
        }
        (Some(key), None) => println!("{}", ctx.config.get(&key)?),
        (Some(key), Some(value)) => {
            ctx.config.set(&key, &value)?;
            ctx.config.save(&ctx.root)?;
            println!("{}", format!("{} = {}", key, value).green());
        }
    }
    Ok(())
}
