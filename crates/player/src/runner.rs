//! Line-oriented terminal front end.
//!
//! Lines starting with `!` are client commands; anything else is chat.

use std::sync::Arc;

use hearthlink_domain::{DomainError, EquipSlot, MapId, PlayerSnapshot, WORLD_MAPS};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::combat::{AttackReport, BattleOutcome, CombatOutcome};
use crate::application::dispatcher::{ChatLine, ChatOrigin};
use crate::application::{SessionError, SessionEvent, SessionView};
use crate::config::ClientConfig;
use crate::infrastructure::{create_session, SessionClient, SystemClock, TungsteniteConnector};

pub const HELP: &str = "\
Commands:
  !connect <server>        connect (localhost, LAN address, tunnel host or ws:// URL)
  !login <server> <user> <pass>
                           log in; the server may be omitted after !connect
  !register <server> <user> <pass>
                           create an account; the server is optional as for !login
  !find <map>              look for a monster (!maps lists them)
  !attack | !potion | !flee
  !equip <item name>       e.g. !equip Iron Sword
  !unequip <slot>          weapon, armor, helmet or boots
  !stats                   refresh and show your character
  !poll                    fetch recent chat
  !maps | !status | !logout | !quit
Anything else is sent as chat. /hideothers and /debug toggle local filters.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerCommand {
    Connect(String),
    Login {
        server: Option<String>,
        username: String,
        password: String,
    },
    Register {
        server: Option<String>,
        username: String,
        password: String,
    },
    Find(MapId),
    Attack,
    Potion,
    Flee,
    Equip(String),
    Unequip(EquipSlot),
    Stats,
    Poll,
    Maps,
    Status,
    Logout,
    Quit,
    Help,
    Chat(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Unknown command !{0} (try !help)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RunnerCommand {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let Some(rest) = line.trim().strip_prefix('!') else {
            return Ok(RunnerCommand::Chat(line.to_string()));
        };
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let name = name.to_ascii_lowercase();
        let command = match name.as_str() {
            "connect" => {
                if args.is_empty() {
                    return Err(CommandParseError::Usage("!connect <server>"));
                }
                RunnerCommand::Connect(args.to_string())
            }
            "login" | "register" => {
                let words: Vec<&str> = args.split_whitespace().collect();
                let (server, username, password) = match words.as_slice() {
                    [server, username, password] => {
                        (Some(server.to_string()), *username, *password)
                    }
                    [username, password] => (None, *username, *password),
                    _ => {
                        return Err(CommandParseError::Usage(if name == "login" {
                            "!login <server> <user> <pass>"
                        } else {
                            "!register <server> <user> <pass>"
                        }));
                    }
                };
                let username = username.to_string();
                let password = password.to_string();
                if name == "login" {
                    RunnerCommand::Login {
                        server,
                        username,
                        password,
                    }
                } else {
                    RunnerCommand::Register {
                        server,
                        username,
                        password,
                    }
                }
            }
            "find" => {
                let id: u8 = args
                    .parse()
                    .map_err(|_| CommandParseError::Usage("!find <map number>"))?;
                RunnerCommand::Find(MapId::new(id)?)
            }
            "attack" => RunnerCommand::Attack,
            "potion" => RunnerCommand::Potion,
            "flee" => RunnerCommand::Flee,
            "equip" => {
                if args.is_empty() {
                    return Err(CommandParseError::Usage("!equip <item name>"));
                }
                RunnerCommand::Equip(args.to_string())
            }
            "unequip" => RunnerCommand::Unequip(args.parse()?),
            "stats" => RunnerCommand::Stats,
            "poll" => RunnerCommand::Poll,
            "maps" => RunnerCommand::Maps,
            "status" => RunnerCommand::Status,
            "logout" => RunnerCommand::Logout,
            "quit" | "exit" => RunnerCommand::Quit,
            "help" => RunnerCommand::Help,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

pub struct Runner {
    client: SessionClient,
    server: Option<String>,
}

impl Runner {
    pub fn new(client: SessionClient, server: Option<String>) -> Self {
        Self { client, server }
    }

    /// Handle one input line. Returns false once the user quits.
    pub async fn handle_line(&mut self, line: &str) -> bool {
        let command = match RunnerCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                return true;
            }
        };
        if command == RunnerCommand::Quit {
            return false;
        }

        match self.execute(command).await {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(e) => println!("{}", e.user_message()),
        }
        true
    }

    async fn execute(&mut self, command: RunnerCommand) -> Result<Option<String>, SessionError> {
        let output = match command {
            RunnerCommand::Connect(server) => {
                self.client.connect(&server).await?;
                self.server = Some(server);
                None
            }
            RunnerCommand::Login {
                server,
                username,
                password,
            } => {
                let server = self.resolve_server(server)?;
                let stats = self.client.login(&server, &username, &password).await?;
                self.server = Some(server);
                Some(format!(
                    "Welcome, {}! Level {} | HP {}/{} | DMG {}",
                    username, stats.level, stats.health, stats.max_health, stats.damage
                ))
            }
            RunnerCommand::Register {
                server,
                username,
                password,
            } => {
                let server = self.resolve_server(server)?;
                let message = self.client.register(&server, &username, &password).await?;
                self.server = Some(server);
                Some(message.unwrap_or_else(|| {
                    format!("Registered {}. Use !login to play.", username)
                }))
            }
            RunnerCommand::Find(map) => Some(render_combat(&self.client.find_monster(map).await?)),
            RunnerCommand::Attack => Some(render_combat(&self.client.attack().await?)),
            RunnerCommand::Potion => Some(render_combat(&self.client.use_potion().await?)),
            RunnerCommand::Flee => Some(render_combat(&self.client.flee().await?)),
            RunnerCommand::Equip(item) => Some(render_combat(&self.client.equip(&item).await?)),
            RunnerCommand::Unequip(slot) => {
                Some(render_combat(&self.client.unequip(slot).await?))
            }
            RunnerCommand::Stats => Some(render_combat(&self.client.refresh_player().await?)),
            RunnerCommand::Poll => {
                self.client.poll().await?;
                None
            }
            RunnerCommand::Maps => Some(render_maps()),
            RunnerCommand::Status => Some(render_status(&self.client.snapshot().await?)),
            RunnerCommand::Logout => {
                self.client.logout().await?;
                None
            }
            RunnerCommand::Help => Some(HELP.to_string()),
            RunnerCommand::Quit => None,
            RunnerCommand::Chat(text) => {
                // Toggles and sends are reported through events.
                self.client.send_chat(&text).await?;
                None
            }
        };
        Ok(output)
    }

    /// An explicit server wins; otherwise fall back to the last one used.
    fn resolve_server(&self, explicit: Option<String>) -> Result<String, SessionError> {
        explicit
            .or_else(|| self.server.clone())
            .ok_or_else(|| {
                SessionError::invalid_state("Name a server, or use !connect <server> first")
            })
    }
}

/// Run the terminal client until stdin closes or the user quits.
pub async fn run(config: ClientConfig) -> anyhow::Result<()> {
    let parts = create_session(
        config.clone(),
        Arc::new(TungsteniteConnector::new()),
        Arc::new(SystemClock::new()),
    );
    parts
        .events
        .subscribe(|event| {
            if let Some(line) = render_event(&event) {
                println!("{}", line);
            }
        })
        .await;

    let mut runner = Runner::new(parts.client.clone(), config.server.clone());
    println!("{}", HELP);
    if let Some(server) = &config.server {
        if let Err(e) = parts.client.connect(server).await {
            println!("{}", e.user_message());
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !runner.handle_line(&line).await {
            break;
        }
    }

    if let Err(e) = parts.client.logout().await {
        tracing::debug!(error = %e, "Logout on exit failed");
    }
    tracing::info!("Hearthlink Player exiting");
    Ok(())
}

pub fn render_event(event: &SessionEvent) -> Option<String> {
    let line = match event {
        SessionEvent::StateChanged(_)
        | SessionEvent::Authenticated { .. }
        | SessionEvent::PlayerUpdated(_) => return None,
        SessionEvent::Connected { reconnected: false } => "Connected".to_string(),
        SessionEvent::Connected { reconnected: true } => "Reconnected".to_string(),
        SessionEvent::ConnectFailed(e) => e.user_message(),
        SessionEvent::ConnectionLost => "Connection lost".to_string(),
        SessionEvent::ReconnectScheduled { attempt, delay } => format!(
            "Reconnecting in {}s (attempt {})",
            delay.as_secs(),
            attempt
        ),
        SessionEvent::ReconnectExhausted => {
            "Could not reconnect. Use !connect to try again.".to_string()
        }
        SessionEvent::Disconnected => "Disconnected".to_string(),
        SessionEvent::LoggedOut => "Logged out".to_string(),
        SessionEvent::Chat(line) => render_chat(line),
        SessionEvent::Notice(text) => text.clone(),
        SessionEvent::Diagnostic(text) => format!("[debug] {}", text),
    };
    Some(line)
}

fn render_chat(line: &ChatLine) -> String {
    match line.origin {
        ChatOrigin::Player => format!("{}: {}", line.from, line.text),
        ChatOrigin::OwnEcho => format!("you: {}", line.text),
        ChatOrigin::Server { for_me: true } => format!("* {}", line.text),
        ChatOrigin::Server { for_me: false } => format!("- {}", line.text),
    }
}

pub fn render_combat(outcome: &CombatOutcome) -> String {
    match outcome {
        CombatOutcome::Encounter(enemy) => format!(
            "A {} (Lv {}) appears! HP {}/{}",
            enemy.name, enemy.level, enemy.hp, enemy.max_hp
        ),
        CombatOutcome::NoMonster => "No monsters found".to_string(),
        CombatOutcome::Attack(report) => render_attack(report),
        CombatOutcome::Healed { amount } => format!("Healed {} HP", amount),
        CombatOutcome::Fled { acknowledged: true } => "You fled the battle".to_string(),
        CombatOutcome::Fled {
            acknowledged: false,
        } => "You fled the battle (server did not confirm)".to_string(),
        CombatOutcome::Equipped(player)
        | CombatOutcome::Unequipped(player)
        | CombatOutcome::PlayerLoaded(player) => render_player(player),
    }
}

fn render_attack(report: &AttackReport) -> String {
    match &report.outcome {
        BattleOutcome::Victory {
            exp_gained,
            gold_gained,
            dropped_items,
            level_up,
        } => {
            let mut line = format!(
                "You hit for {}. Victory! +{} EXP, +{} gold",
                report.player_damage, exp_gained, gold_gained
            );
            if !dropped_items.is_empty() {
                line.push_str(&format!(". Loot: {}", dropped_items.join(", ")));
            }
            if *level_up {
                line.push_str(". Level up!");
            }
            line
        }
        BattleOutcome::Defeat => "You were defeated".to_string(),
        BattleOutcome::Ongoing => {
            let mut line = format!("You hit for {}", report.player_damage);
            if let Some(enemy) = &report.enemy {
                line.push_str(&format!(". {} HP {}/{}", enemy.name, enemy.hp, enemy.max_hp));
            }
            if let Some(damage) = report.enemy_damage {
                line.push_str(&format!(". It hits back for {}", damage));
            }
            line
        }
    }
}

fn render_player(player: &PlayerSnapshot) -> String {
    let mut line = format!(
        "{} Lv {} | HP {}/{} | DMG {} | EXP {}/{} | Gold {}",
        player.username,
        player.level,
        player.hp,
        player.max_hp,
        player.total_damage(),
        player.exp,
        player.exp_to_next_level(),
        player.gold
    );
    for slot in EquipSlot::ALL {
        if let Some(item) = player.equipped.get(slot) {
            line.push_str(&format!("\n  {}: {}", slot, item));
        }
    }
    if !player.inventory.is_empty() {
        let items: Vec<String> = player
            .inventory
            .iter()
            .map(|i| format!("{} x{}", i.name, i.quantity))
            .collect();
        line.push_str(&format!("\n  Bag: {}", items.join(", ")));
    }
    line
}

fn render_maps() -> String {
    WORLD_MAPS
        .iter()
        .map(|m| format!("{}: {} (Lv {}+)", m.id, m.name, m.min_level))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_status(view: &SessionView) -> String {
    let mut line = format!("{:?}", view.state);
    if let Some(url) = &view.url {
        line.push_str(&format!(" to {}", url));
    }
    if let Some(user) = &view.username {
        line.push_str(&format!(" as {}", user));
    }
    if let Some(enemy) = &view.enemy {
        line.push_str(&format!(" | fighting {} ({}/{})", enemy.name, enemy.hp, enemy.max_hp));
    }
    if view.reconnect_attempt > 0 {
        line.push_str(&format!(" | reconnect attempt {}", view.reconnect_attempt));
    }
    line
}
