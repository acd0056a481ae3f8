use std::time::Duration;

use leaf_core::browser::{BrowserEffect, BrowserKey, BrowserOptions, DocumentBrowser};
use leaf_core::mutation::{MutationCommand, MutationResponse};
use leaf_core::profiles::ConnectionProfile;
use leaf_core::sequencer::{LoadRequest, LoadResponse};

/// Input to [`TuiApp::handle`]: user keys, terminal changes and finished
/// background work.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Quit,
    Key(BrowserKey),
    Resize(u16),
    Connected(Result<ConnectedInfo, String>),
    DatabasesLoaded(Result<Vec<String>, String>),
    CollectionsLoaded {
        database: String,
        result: Result<Vec<String>, String>,
    },
    PageLoaded(LoadResponse),
    MutationApplied(MutationResponse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedInfo {
    pub profile: ConnectionProfile,
    pub latency: Duration,
}

/// Background work requested by the app, run by the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect(ConnectionProfile),
    Disconnect,
    LoadDatabases,
    LoadCollections(String),
    OpenCollection { database: String, collection: String },
    Load(LoadRequest),
    Mutate(MutationCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickList {
    items: Vec<String>,
    selected: usize,
    status: ListStatus,
}

impl PickList {
    fn loading() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            status: ListStatus::Loading,
        }
    }

    fn apply(&mut self, result: Result<Vec<String>, String>) {
        match result {
            Ok(items) => {
                self.items = items;
                self.selected = self.selected.min(self.items.len().saturating_sub(1));
                self.status = ListStatus::Ready;
            }
            Err(error) => self.status = ListStatus::Error(error),
        }
    }

    fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn move_down(&mut self) {
        self.selected = (self.selected + 1).min(self.items.len().saturating_sub(1));
    }

    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn selected_item(&self) -> Option<&str> {
        self.items.get(self.selected).map(String::as_str)
    }

    #[must_use]
    pub fn status(&self) -> &ListStatus {
        &self.status
    }
}

#[derive(Debug)]
pub enum Screen {
    Connect {
        url: String,
        connecting: bool,
        error: Option<String>,
    },
    Databases(PickList),
    Collections {
        database: String,
        list: PickList,
    },
    Documents {
        database: String,
        browser: DocumentBrowser,
    },
}

impl Screen {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "Connect",
            Self::Databases(_) => "Databases",
            Self::Collections { .. } => "Collections",
            Self::Documents { .. } => "Documents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuiOptions {
    pub url: String,
    /// Saved profile the URL came from, if any.
    pub profile: Option<ConnectionProfile>,
    pub read_only: bool,
}

#[derive(Debug)]
pub struct TuiApp {
    options: TuiOptions,
    screen: Screen,
    connected: Option<ConnectedInfo>,
    terminal_width: u16,
    should_quit: bool,
    status_line: String,
}

impl TuiApp {
    #[must_use]
    pub fn new(options: TuiOptions, terminal_width: u16) -> Self {
        let url = options.url.clone();
        Self {
            options,
            screen: Screen::Connect {
                url,
                connecting: false,
                error: None,
            },
            connected: None,
            terminal_width,
            should_quit: false,
            status_line: "Enter a connection URL and press Enter".to_string(),
        }
    }

    #[must_use]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    #[must_use]
    pub fn connected_profile(&self) -> Option<&ConnectionProfile> {
        self.connected.as_ref().map(|info| &info.profile)
    }

    /// Breadcrumb of where the user is: profile, database, collection.
    #[must_use]
    pub fn location(&self) -> String {
        let profile = self
            .connected_profile()
            .map_or("not connected", |profile| profile.name.as_str());
        match &self.screen {
            Screen::Connect { .. } | Screen::Databases(_) => profile.to_string(),
            Screen::Collections { database, .. } => format!("{profile} / {database}"),
            Screen::Documents { database, browser } => {
                format!("{profile} / {database} / {}", browser.collection())
            }
        }
    }

    pub fn handle(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Msg::Key(key) => self.handle_key(key),
            Msg::Resize(width) => {
                self.terminal_width = width;
                if let Screen::Documents { browser, .. } = &mut self.screen {
                    browser.set_terminal_width(width);
                }
                Vec::new()
            }
            Msg::Connected(result) => self.on_connected(result),
            Msg::DatabasesLoaded(result) => {
                if let Screen::Databases(list) = &mut self.screen {
                    list.apply(result);
                }
                Vec::new()
            }
            Msg::CollectionsLoaded { database, result } => {
                if let Screen::Collections {
                    database: shown,
                    list,
                } = &mut self.screen
                {
                    if *shown == database {
                        list.apply(result);
                    }
                }
                Vec::new()
            }
            Msg::PageLoaded(response) => match &mut self.screen {
                Screen::Documents { browser, .. } => {
                    browser_commands(browser.apply_load(response))
                }
                _ => Vec::new(),
            },
            Msg::MutationApplied(response) => match &mut self.screen {
                Screen::Documents { browser, .. } => {
                    browser_commands(browser.apply_mutation(response))
                }
                _ => Vec::new(),
            },
        }
    }

    fn on_connected(&mut self, result: Result<ConnectedInfo, String>) -> Vec<Command> {
        let Screen::Connect { connecting, error, .. } = &mut self.screen else {
            return Vec::new();
        };
        *connecting = false;
        match result {
            Ok(info) => {
                self.status_line = format!(
                    "Connected to {} in {} ms",
                    info.profile.name,
                    info.latency.as_millis()
                );
                self.connected = Some(info);
                self.screen = Screen::Databases(PickList::loading());
                vec![Command::LoadDatabases]
            }
            Err(message) => {
                self.status_line = "Connection failed".to_string();
                *error = Some(message);
                Vec::new()
            }
        }
    }

    fn handle_key(&mut self, key: BrowserKey) -> Vec<Command> {
        match &mut self.screen {
            Screen::Connect { .. } => self.handle_connect_key(key),
            Screen::Databases(_) => self.handle_databases_key(key),
            Screen::Collections { .. } => self.handle_collections_key(key),
            Screen::Documents { browser, .. } => match browser.handle_key(key) {
                Some(BrowserEffect::Exit) => self.leave_collection(),
                effect => browser_commands(effect),
            },
        }
    }

    fn handle_connect_key(&mut self, key: BrowserKey) -> Vec<Command> {
        let Screen::Connect {
            url,
            connecting,
            error,
        } = &mut self.screen
        else {
            return Vec::new();
        };
        if *connecting {
            return Vec::new();
        }
        match key {
            BrowserKey::Escape => self.should_quit = true,
            BrowserKey::Backspace => {
                url.pop();
            }
            BrowserKey::Char(ch) if !ch.is_control() => url.push(ch),
            BrowserKey::Enter => {
                let url = url.trim().to_string();
                if url.is_empty() {
                    *error = Some("Connection URL is required".to_string());
                    return Vec::new();
                }
                *connecting = true;
                *error = None;
                self.status_line = "Connecting...".to_string();
                return vec![Command::Connect(self.profile_for(&url))];
            }
            _ => {}
        }
        Vec::new()
    }

    /// The saved profile when the URL still matches it, otherwise an ad-hoc
    /// profile named after the host.
    fn profile_for(&self, url: &str) -> ConnectionProfile {
        match &self.options.profile {
            Some(profile) if profile.url == url => profile.clone(),
            _ => {
                let mut profile = ConnectionProfile::from_url(url);
                profile.read_only = self.options.read_only;
                profile
            }
        }
    }

    fn handle_databases_key(&mut self, key: BrowserKey) -> Vec<Command> {
        let Screen::Databases(list) = &mut self.screen else {
            return Vec::new();
        };
        match key {
            BrowserKey::Up => list.move_up(),
            BrowserKey::Down => list.move_down(),
            BrowserKey::Char('r') => {
                *list = PickList::loading();
                return vec![Command::LoadDatabases];
            }
            BrowserKey::Enter => {
                let Some(database) = list.selected_item().map(str::to_string) else {
                    return Vec::new();
                };
                self.screen = Screen::Collections {
                    database: database.clone(),
                    list: PickList::loading(),
                };
                return vec![Command::LoadCollections(database)];
            }
            BrowserKey::Escape => {
                let url = self
                    .connected
                    .take()
                    .map_or_else(|| self.options.url.clone(), |info| info.profile.url);
                self.screen = Screen::Connect {
                    url,
                    connecting: false,
                    error: None,
                };
                self.status_line = "Disconnected".to_string();
                return vec![Command::Disconnect];
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_collections_key(&mut self, key: BrowserKey) -> Vec<Command> {
        let Screen::Collections { database, list } = &mut self.screen else {
            return Vec::new();
        };
        match key {
            BrowserKey::Up => list.move_up(),
            BrowserKey::Down => list.move_down(),
            BrowserKey::Char('r') => {
                *list = PickList::loading();
                return vec![Command::LoadCollections(database.clone())];
            }
            BrowserKey::Enter => {
                let Some(collection) = list.selected_item().map(str::to_string) else {
                    return Vec::new();
                };
                let database = database.clone();
                let mut browser = DocumentBrowser::new(
                    collection.clone(),
                    BrowserOptions {
                        read_only: self.read_only(),
                        terminal_width: self.terminal_width,
                    },
                );
                let load = browser.reload();
                self.screen = Screen::Documents {
                    database: database.clone(),
                    browser,
                };
                let mut commands = vec![Command::OpenCollection {
                    database,
                    collection,
                }];
                commands.extend(browser_commands(Some(load)));
                return commands;
            }
            BrowserKey::Escape => {
                self.screen = Screen::Databases(PickList::loading());
                return vec![Command::LoadDatabases];
            }
            _ => {}
        }
        Vec::new()
    }

    fn leave_collection(&mut self) -> Vec<Command> {
        let Screen::Documents { database, .. } = &self.screen else {
            return Vec::new();
        };
        let database = database.clone();
        self.screen = Screen::Collections {
            database: database.clone(),
            list: PickList::loading(),
        };
        vec![Command::LoadCollections(database)]
    }

    fn read_only(&self) -> bool {
        self.options.read_only
            || self
                .connected_profile()
                .is_some_and(|profile| profile.read_only)
    }
}

fn browser_commands(effect: Option<BrowserEffect>) -> Vec<Command> {
    match effect {
        Some(BrowserEffect::Load(request)) => vec![Command::Load(request)],
        Some(BrowserEffect::Mutate(command)) => vec![Command::Mutate(command)],
        Some(BrowserEffect::Exit) | None => Vec::new(),
    }
}
