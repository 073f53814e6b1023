use super::*;

#[test]
fn parses_db_commands() {
    let cli = Cli::try_parse_from(["brickdesk", "db", "migrate"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));

    let cli = Cli::try_parse_from(["brickdesk", "db", "ping"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["brickdesk"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn sync_full_accepts_optional_user() {
    let cli = Cli::try_parse_from(["brickdesk", "sync", "full"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sync {
            command: SyncCommands::Full { user: None }
        })
    ));

    let id = "0d6c3a52-9f1e-4b8a-8c27-5e4f3b2a1d09";
    let cli = Cli::try_parse_from(["brickdesk", "sync", "amazon", "--user", id]).unwrap();
    match cli.command {
        Some(Commands::Sync {
            command: SyncCommands::Amazon { user: Some(user) },
        }) => assert_eq!(user.to_string(), id),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn sync_rejects_malformed_user() {
    assert!(Cli::try_parse_from(["brickdesk", "sync", "full", "--user", "bob"]).is_err());
}

#[test]
fn discover_asins_defaults() {
    let cli = Cli::try_parse_from(["brickdesk", "discover-asins"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::DiscoverAsins {
            offset: 0,
            limit: 100,
            all: false
        })
    ));
}

#[test]
fn discover_asins_with_paging_flags() {
    let cli = Cli::try_parse_from([
        "brickdesk",
        "discover-asins",
        "--offset",
        "200",
        "--limit",
        "50",
        "--all",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::DiscoverAsins {
            offset: 200,
            limit: 50,
            all: true
        })
    ));
}

#[test]
fn backfill_rrp_skip_flag() {
    let cli = Cli::try_parse_from(["brickdesk", "backfill-rrp", "--skip-brickset"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::BackfillRrp {
            skip_brickset: true
        })
    ));
}

#[test]
fn keepa_export_needs_set_numbers() {
    assert!(Cli::try_parse_from(["brickdesk", "keepa-export"]).is_err());

    let cli = Cli::try_parse_from(["brickdesk", "keepa-export", "75192-1", "10294-1"]).unwrap();
    match cli.command {
        Some(Commands::KeepaExport { set_numbers }) => {
            assert_eq!(set_numbers, vec!["75192-1", "10294-1"]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn resolve_user_prefers_flag() {
    let vars = std::collections::HashMap::from([
        ("DATABASE_URL", "postgres://localhost/brickdesk".to_owned()),
        (
            "BRICKDESK_SYNC_USER_ID",
            "11111111-2222-4333-8444-555555555555".to_owned(),
        ),
    ]);
    let config = brickdesk_core::build_app_config(|k| {
        vars.get(k).cloned().ok_or(std::env::VarError::NotPresent)
    })
    .unwrap();

    let flag = Uuid::new_v4();
    assert_eq!(sync::resolve_user(Some(flag), &config).unwrap(), flag);
    assert_eq!(
        sync::resolve_user(None, &config).unwrap().to_string(),
        "11111111-2222-4333-8444-555555555555"
    );

    let mut bare = config.clone();
    bare.sync_user_id = None;
    assert!(sync::resolve_user(None, &bare).is_err());
}
