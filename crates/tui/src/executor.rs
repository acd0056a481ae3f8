//! Runs [`Command`]s on a tokio runtime and turns their outcomes back into
//! [`Msg`]s for the event loop.

use std::sync::Arc;

use leaf_adapters::mongo::{MongoCatalog, MongoCollectionSource, MongoConnectionBackend};
use leaf_core::audit_trail::{AuditContext, AuditRecord, FileAuditTrail};
use leaf_core::catalog::{collection_names, database_names};
use leaf_core::connection_manager::{ConnectionManager, ConnectionManagerError};
use leaf_core::data_source::DataSourceError;
use leaf_core::mutation::{execute_mutation, MutationResponse};
use leaf_core::profiles::{ConnectionProfile, FileProfilesStore};
use leaf_core::sequencer::{fetch_page, LoadResponse};
use mongodb::Client;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::app::{Command, ConnectedInfo, Msg};

type Manager = ConnectionManager<MongoConnectionBackend>;

const NOT_CONNECTED: &str = "not connected";

#[derive(Debug)]
pub(crate) enum Completion {
    Connected {
        manager: Manager,
        result: Result<std::time::Duration, ConnectionManagerError>,
    },
    Databases(Result<Vec<String>, String>),
    Collections {
        database: String,
        result: Result<Vec<String>, String>,
    },
    Page {
        session: u64,
        response: LoadResponse,
    },
    /// `context` is absent for writes that never reached the store.
    Mutation {
        session: u64,
        context: Option<AuditContext>,
        response: MutationResponse,
    },
}

/// Owns the live connection and the collection being browsed.
///
/// `session` changes whenever a collection is opened or the connection is
/// dropped, so results of work started for an earlier collection are never
/// handed to a newer browser.
pub(crate) struct Executor {
    runtime: Runtime,
    sender: UnboundedSender<Completion>,
    receiver: UnboundedReceiver<Completion>,
    manager: Option<Manager>,
    source: Option<Arc<MongoCollectionSource>>,
    audit_context: Option<AuditContext>,
    audit_trail: Option<FileAuditTrail>,
    session: u64,
}

impl Executor {
    pub(crate) fn new(runtime: Runtime) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let audit_trail = match FileAuditTrail::load_default() {
            Ok(trail) => Some(trail),
            Err(error) => {
                warn!(%error, "audit trail disabled");
                None
            }
        };
        Self {
            runtime,
            sender,
            receiver,
            manager: None,
            source: None,
            audit_context: None,
            audit_trail,
            session: 0,
        }
    }

    pub(crate) fn try_next(&mut self) -> Option<Completion> {
        self.receiver.try_recv().ok()
    }

    pub(crate) fn execute(&mut self, command: Command) {
        match command {
            Command::Connect(profile) => self.connect(profile),
            Command::Disconnect => self.disconnect(),
            Command::LoadDatabases => {
                let Some(client) = self.client() else {
                    deliver(&self.sender, Completion::Databases(Err(NOT_CONNECTED.into())));
                    return;
                };
                let sender = self.sender.clone();
                self.runtime.spawn(async move {
                    let result = database_names(&MongoCatalog::new(client))
                        .await
                        .map_err(|error| error.to_string());
                    deliver(&sender, Completion::Databases(result));
                });
            }
            Command::LoadCollections(database) => {
                let Some(client) = self.client() else {
                    deliver(
                        &self.sender,
                        Completion::Collections {
                            database,
                            result: Err(NOT_CONNECTED.into()),
                        },
                    );
                    return;
                };
                let sender = self.sender.clone();
                self.runtime.spawn(async move {
                    let result = collection_names(&MongoCatalog::new(client), &database)
                        .await
                        .map_err(|error| error.to_string());
                    deliver(&sender, Completion::Collections { database, result });
                });
            }
            Command::OpenCollection {
                database,
                collection,
            } => self.open_collection(database, collection),
            Command::Load(request) => {
                let Some(source) = self.source.clone() else {
                    warn!("page load requested without an open collection");
                    let response = LoadResponse {
                        token: request.token,
                        result: Err(DataSourceError::new(NOT_CONNECTED)),
                    };
                    deliver(
                        &self.sender,
                        Completion::Page {
                            session: self.session,
                            response,
                        },
                    );
                    return;
                };
                let sender = self.sender.clone();
                let session = self.session;
                self.runtime.spawn(async move {
                    let response = fetch_page(source.as_ref(), &request).await;
                    deliver(&sender, Completion::Page { session, response });
                });
            }
            Command::Mutate(command) => {
                let (Some(source), Some(context)) =
                    (self.source.clone(), self.audit_context.clone())
                else {
                    warn!("mutation requested without an open collection");
                    let response = MutationResponse {
                        command,
                        result: Err(DataSourceError::new(NOT_CONNECTED)),
                    };
                    deliver(
                        &self.sender,
                        Completion::Mutation {
                            session: self.session,
                            context: None,
                            response,
                        },
                    );
                    return;
                };
                let sender = self.sender.clone();
                let session = self.session;
                self.runtime.spawn(async move {
                    let response = execute_mutation(source.as_ref(), command).await;
                    deliver(
                        &sender,
                        Completion::Mutation {
                            session,
                            context: Some(context),
                            response,
                        },
                    );
                });
            }
        }
    }

    /// Records side effects of a finished task and converts it into the
    /// message for the app. Returns `None` for results that no longer apply.
    pub(crate) fn absorb(&mut self, completion: Completion) -> Option<Msg> {
        match completion {
            Completion::Connected { manager, result } => match result {
                Ok(latency) => {
                    let profile = manager.active_profile().cloned()?;
                    remember_profile(&profile);
                    self.manager = Some(manager);
                    Some(Msg::Connected(Ok(ConnectedInfo { profile, latency })))
                }
                Err(error) => Some(Msg::Connected(Err(error.to_string()))),
            },
            Completion::Databases(result) => Some(Msg::DatabasesLoaded(result)),
            Completion::Collections { database, result } => {
                Some(Msg::CollectionsLoaded { database, result })
            }
            Completion::Page { session, response } => {
                if session != self.session {
                    debug!(session, "discarding page for a closed collection");
                    return None;
                }
                Some(Msg::PageLoaded(response))
            }
            Completion::Mutation {
                session,
                context,
                response,
            } => {
                if let Some(context) = &context {
                    self.audit(context, &response);
                }
                (session == self.session).then_some(Msg::MutationApplied(response))
            }
        }
    }

    /// Closes the connection, waiting for the driver to shut down.
    pub(crate) fn shutdown(mut self) {
        if let Some(mut manager) = self.manager.take() {
            if let Err(error) = self.runtime.block_on(manager.disconnect()) {
                warn!(%error, "disconnect on exit failed");
            }
        }
    }

    fn client(&self) -> Option<Client> {
        self.manager.as_ref()?.connection().cloned()
    }

    fn connect(&mut self, profile: ConnectionProfile) {
        if let Some(manager) = &self.manager {
            warn!(
                active = ?manager.active_profile().map(|profile| &profile.name),
                "connect requested while connected"
            );
            return;
        }
        info!(url = %profile.redacted_url(), "connecting");
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let mut manager = ConnectionManager::new(MongoConnectionBackend);
            let result = manager.connect(profile).await;
            deliver(&sender, Completion::Connected { manager, result });
        });
    }

    fn disconnect(&mut self) {
        self.session += 1;
        self.source = None;
        self.audit_context = None;
        let Some(mut manager) = self.manager.take() else {
            return;
        };
        self.runtime.spawn(async move {
            if let Err(error) = manager.disconnect().await {
                warn!(%error, "disconnect failed");
            }
        });
    }

    fn open_collection(&mut self, database: String, collection: String) {
        self.session += 1;
        let Some(client) = self.client() else {
            warn!(%database, %collection, "cannot open collection while disconnected");
            self.source = None;
            return;
        };
        let source = MongoCollectionSource::new(&client, &database, &collection);
        debug!(namespace = %source.namespace(), session = self.session, "opened collection");
        self.source = Some(Arc::new(source));
        self.audit_context = Some(AuditContext {
            profile_name: self
                .manager
                .as_ref()
                .and_then(Manager::active_profile)
                .map(|profile| profile.name.clone()),
            database,
            collection,
        });
    }

    fn audit(&self, context: &AuditContext, response: &MutationResponse) {
        let Some(trail) = &self.audit_trail else {
            return;
        };
        let record = AuditRecord::from_mutation(context, response);
        if let Err(error) = trail.append(&record) {
            warn!(%error, path = %trail.path().display(), "failed to append audit record");
        }
    }
}

fn deliver(sender: &UnboundedSender<Completion>, completion: Completion) {
    if sender.send(completion).is_err() {
        debug!("event loop closed before background work finished");
    }
}

/// Saves the profile for the next session unless its URL carries a password.
fn remember_profile(profile: &ConnectionProfile) {
    let mut store = match FileProfilesStore::load_default() {
        Ok(store) => store,
        Err(error) => {
            warn!(%error, "failed to load profiles");
            return;
        }
    };
    if !store.upsert_profile(profile.clone()) {
        info!(profile = %profile.name, "not saving profile with inline password");
        return;
    }
    if let Err(error) = store.persist() {
        warn!(%error, "failed to save profile");
    }
}

#[cfg(test)]
mod tests {
    use leaf_core::document::FieldValue;
    use leaf_core::mutation::MutationCommand;
    use leaf_core::query::{QuerySpec, SortSpec};
    use leaf_core::sequencer::{LoadRequest, RequestSequencer};

    use super::{Executor, NOT_CONNECTED};
    use crate::app::{Command, Msg};

    fn executor() -> Executor {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");
        Executor::new(runtime)
    }

    fn next_message(executor: &mut Executor) -> Msg {
        let completion = executor.try_next().expect("completion should be queued");
        executor.absorb(completion).expect("completion should apply")
    }

    #[test]
    fn load_without_open_collection_fails_instead_of_hanging() {
        let mut executor = executor();
        let token = RequestSequencer::new().mint();
        executor.execute(Command::Load(LoadRequest {
            token,
            query: QuerySpec::All,
            sort: SortSpec::default(),
            page_index: 0,
            skip: 0,
            limit: 10,
        }));

        let Msg::PageLoaded(response) = next_message(&mut executor) else {
            panic!("expected a page response");
        };
        assert_eq!(response.token, token);
        assert_eq!(
            response.result.map_err(|error| error.to_string()),
            Err(NOT_CONNECTED.to_string())
        );
    }

    #[test]
    fn mutation_without_open_collection_fails_instead_of_hanging() {
        let mut executor = executor();
        let command = MutationCommand::delete(FieldValue::Int(1));
        executor.execute(Command::Mutate(command.clone()));

        let Msg::MutationApplied(response) = next_message(&mut executor) else {
            panic!("expected a mutation response");
        };
        assert_eq!(response.command, command);
        assert!(response.result.is_err());
    }

    #[test]
    fn catalog_requests_while_disconnected_report_errors() {
        let mut executor = executor();
        executor.execute(Command::LoadDatabases);
        assert_eq!(
            next_message(&mut executor),
            Msg::DatabasesLoaded(Err(NOT_CONNECTED.to_string()))
        );
    }
}
