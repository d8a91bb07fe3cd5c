use roster_tree::config::{load_config, CliArgs};
use roster_tree::model::{Account, Node, NodeKind, NodeVariant, Protocol, Status};
use roster_tree::roster::{self, RosterEntry};
use roster_tree::session::{AccountSettings, ConnectError, Connector, Session};
use roster_tree::{ContactTree, Hierarchy, NodeFactory, WorkingCopy};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Answers every login and hands out a fixed roster.
struct DemoConnector;

impl Connector for DemoConnector {
    fn connect(&mut self, account: &AccountSettings) -> Result<(), ConnectError> {
        match account.protocol {
            Some(_) => Ok(()),
            None => Err(ConnectError::NoProtocol),
        }
    }

    fn disconnect(&mut self, _account: &AccountSettings) {}

    fn roster(&mut self, _account: &AccountSettings) -> Vec<RosterEntry> {
        vec![
            RosterEntry::new(Some("Alice"), "alice@example.com", Status::Online),
            RosterEntry::new(Some("bob"), "bob@example.com", Status::Away),
            RosterEntry::new(None, "carol@example.com", Status::Busy),
        ]
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = load_config(&args)?;

    if args.debug_config {
        println!("Configuration:");
        println!("{:#?}", config);
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut tree = Hierarchy::new();
    let mut factory = NodeFactory::with_defaults(&config);
    let mut session = Session::new(DemoConnector);
    session.install(&tree, &mut factory)?;
    let view = ContactTree::new(&tree)?;

    // Edit the account list offline, then commit it in one step
    let mut accounts = WorkingCopy::of(&tree, tree.root(), NodeKind::Account)?;
    let gtalk = accounts.add(factory.create(NodeVariant::Account(Some(Protocol::GoogleTalk)))?)?;
    accounts.tree_mut().set_name(gtalk, Some("demo".to_string()))?;
    accounts.tree_mut().set_connect_automatically(gtalk, true)?;
    let gtalk_uuid = accounts.tree().uuid(gtalk)?;
    accounts.add(Node::account("offline", Account::stub()))?;
    let report = accounts.commit(&mut tree, &factory)?;
    info!(added = report.added.len(), "accounts committed");

    let outcome = session.run_pending(&mut tree)?;
    info!(?outcome, "session requests handled");

    if let Some(account) = tree.find_by_uuid(gtalk_uuid) {
        let friends = tree.add_new(account, Node::category("Friends"))?;
        if let Some(alice) = roster::find_contact_by_address(&tree, account, "alice@example.com") {
            tree.add_member(friends, alice)?;
            roster::create_conversation(&mut tree, account, &[alice])?;
        }
    }

    println!("{}", view.outline(&tree));
    view.release(&tree)?;
    Ok(())
}
