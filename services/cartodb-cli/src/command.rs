//! Command-line parsing
//!
//! Hand-rolled like the rest of the binary's argument handling: a global
//! `--config <path>` followed by one subcommand and its positionals.

use anyhow::{Context, Result, anyhow, bail};
use cartodb_client::{CartoClient, RecordsPage, ResponseEnvelope};

pub const USAGE: &str = "\
usage: cartodb [--config <path>] <command> [args]

commands:
  sql <query>                                  run a SQL statement
  create-table <table>
  table <table>                                show table details
  add-column <table> <column> <type>
  drop-column <table> <column>
  change-column <table> <column> <new-name> <new-type>
  row <table> <id>
  records <table> [--rows-per-page N] [--page N]
  insert-row <table> <column=value>...          values are SQL literals
  update-row <table> <id> <column=value>...
  delete-row <table> <id>
  viz                                          list visualizations
  table-viz                                    list table visualizations
  drop-table-viz <table>
  logout                                       forget the cached token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sql(String),
    CreateTable(String),
    Table(String),
    AddColumn { table: String, column: String, column_type: String },
    DropColumn { table: String, column: String },
    ChangeColumn { table: String, column: String, new_name: String, new_type: String },
    Row { table: String, id: u64 },
    Records { table: String, page: RecordsPage },
    InsertRow { table: String, data: Vec<(String, String)> },
    UpdateRow { table: String, id: u64, data: Vec<(String, String)> },
    DeleteRow { table: String, id: u64 },
    Visualizations,
    TableVisualizations,
    DropTableVisualization(String),
    Logout,
}

/// Parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config_path: Option<String>,
    pub command: Command,
}

/// Parse arguments (without the program name).
pub fn parse(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config needs a path")?;
            config_path = Some(path.clone());
        } else {
            rest.push(arg.as_str());
        }
    }

    let (name, args) = rest.split_first().ok_or_else(|| anyhow!("missing command"))?;
    let command = match (*name, args) {
        ("sql", [query]) => Command::Sql(query.to_string()),
        ("create-table", [table]) => Command::CreateTable(table.to_string()),
        ("table", [table]) => Command::Table(table.to_string()),
        ("add-column", [table, column, column_type]) => Command::AddColumn {
            table: table.to_string(),
            column: column.to_string(),
            column_type: column_type.to_string(),
        },
        ("drop-column", [table, column]) => Command::DropColumn {
            table: table.to_string(),
            column: column.to_string(),
        },
        ("change-column", [table, column, new_name, new_type]) => Command::ChangeColumn {
            table: table.to_string(),
            column: column.to_string(),
            new_name: new_name.to_string(),
            new_type: new_type.to_string(),
        },
        ("row", [table, id]) => Command::Row {
            table: table.to_string(),
            id: parse_id(id)?,
        },
        ("records", [table, flags @ ..]) => Command::Records {
            table: table.to_string(),
            page: parse_page(flags)?,
        },
        ("insert-row", [table, pairs @ ..]) if !pairs.is_empty() => Command::InsertRow {
            table: table.to_string(),
            data: parse_pairs(pairs)?,
        },
        ("update-row", [table, id, pairs @ ..]) if !pairs.is_empty() => Command::UpdateRow {
            table: table.to_string(),
            id: parse_id(id)?,
            data: parse_pairs(pairs)?,
        },
        ("delete-row", [table, id]) => Command::DeleteRow {
            table: table.to_string(),
            id: parse_id(id)?,
        },
        ("viz", []) => Command::Visualizations,
        ("table-viz", []) => Command::TableVisualizations,
        ("drop-table-viz", [table]) => Command::DropTableVisualization(table.to_string()),
        ("logout", []) => Command::Logout,
        (name, _) => bail!("unknown command or wrong arguments: {name}"),
    };

    Ok(Invocation {
        config_path,
        command,
    })
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.parse()
        .with_context(|| format!("row id must be a non-negative integer, got {raw:?}"))
}

fn parse_page(flags: &[&str]) -> Result<RecordsPage> {
    let mut page = RecordsPage::default();
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .with_context(|| format!("{flag} needs a value"))?;
        let value: u64 = value
            .parse()
            .with_context(|| format!("{flag} must be a number, got {value:?}"))?;
        match *flag {
            "--rows-per-page" => page.rows_per_page = Some(value),
            "--page" => page.page = Some(value),
            other => bail!("unknown records flag: {other}"),
        }
    }
    Ok(page)
}

fn parse_pairs(pairs: &[&str]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| -> Result<(String, String)> {
            let (column, value) = pair
                .split_once('=')
                .with_context(|| format!("expected column=value, got {pair:?}"))?;
            if column.is_empty() {
                bail!("empty column name in {pair:?}");
            }
            Ok((column.to_string(), value.to_string()))
        })
        .collect()
}

fn borrowed(data: &[(String, String)]) -> Vec<(&str, &str)> {
    data.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

/// Run `command`. `None` means there is nothing to print.
pub async fn run(client: &CartoClient, command: Command) -> Result<Option<ResponseEnvelope>> {
    let response = match command {
        Command::Sql(query) => client.run_sql(&query).await?,
        Command::CreateTable(table) => client.create_table(&table).await?,
        Command::Table(table) => client.get_table(&table).await?,
        Command::AddColumn {
            table,
            column,
            column_type,
        } => client.add_column(&table, &column, &column_type).await?,
        Command::DropColumn { table, column } => client.drop_column(&table, &column).await?,
        Command::ChangeColumn {
            table,
            column,
            new_name,
            new_type,
        } => {
            client
                .change_column(&table, &column, &new_name, &new_type)
                .await?
        }
        Command::Row { table, id } => client.get_row(&table, id).await?,
        Command::Records { table, page } => client.get_records(&table, page).await?,
        Command::InsertRow { table, data } => client.insert_row(&table, &borrowed(&data)).await?,
        Command::UpdateRow { table, id, data } => {
            client.update_row(&table, id, &borrowed(&data)).await?
        }
        Command::DeleteRow { table, id } => client.delete_row(&table, id).await?,
        Command::Visualizations => client.get_visualizations().await?,
        Command::TableVisualizations => client.get_table_visualizations().await?,
        Command::DropTableVisualization(table) => {
            match client.drop_table_visualization(&table).await? {
                Some(response) => response,
                None => bail!("no table visualization named {table:?}"),
            }
        }
        Command::Logout => {
            client.logout().await?;
            return Ok(None);
        }
    };
    Ok(Some(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn command(raw: &[&str]) -> Command {
        parse(&args(raw)).unwrap().command
    }

    #[test]
    fn config_flag_anywhere() {
        let inv = parse(&args(&["sql", "SELECT 1", "--config", "/etc/c.toml"])).unwrap();
        assert_eq!(inv.config_path.as_deref(), Some("/etc/c.toml"));
        assert_eq!(inv.command, Command::Sql("SELECT 1".into()));

        let inv = parse(&args(&["--config", "a.toml", "logout"])).unwrap();
        assert_eq!(inv.config_path.as_deref(), Some("a.toml"));
        assert_eq!(inv.command, Command::Logout);
    }

    #[test]
    fn config_flag_without_value_fails() {
        assert!(parse(&args(&["logout", "--config"])).is_err());
    }

    #[test]
    fn missing_or_unknown_command_fails() {
        assert!(parse(&[]).is_err());
        assert!(parse(&args(&["frobnicate"])).is_err());
        assert!(parse(&args(&["sql"])).is_err());
        assert!(parse(&args(&["viz", "extra"])).is_err());
    }

    #[test]
    fn column_commands() {
        assert_eq!(
            command(&["change-column", "cities", "pop", "population", "number"]),
            Command::ChangeColumn {
                table: "cities".into(),
                column: "pop".into(),
                new_name: "population".into(),
                new_type: "number".into(),
            }
        );
        assert_eq!(
            command(&["drop-column", "cities", "pop"]),
            Command::DropColumn {
                table: "cities".into(),
                column: "pop".into(),
            }
        );
    }

    #[test]
    fn records_flags() {
        assert_eq!(
            command(&["records", "cities", "--page", "3", "--rows-per-page", "50"]),
            Command::Records {
                table: "cities".into(),
                page: RecordsPage::new(50, 3),
            }
        );
        assert_eq!(
            command(&["records", "cities"]),
            Command::Records {
                table: "cities".into(),
                page: RecordsPage::default(),
            }
        );
        assert!(parse(&args(&["records", "cities", "--page"])).is_err());
        assert!(parse(&args(&["records", "cities", "--page", "x"])).is_err());
        assert!(parse(&args(&["records", "cities", "--limit", "1"])).is_err());
    }

    #[test]
    fn row_pairs_keep_sql_literals() {
        assert_eq!(
            command(&["insert-row", "cities", "name='Madrid'", "pop=3300000"]),
            Command::InsertRow {
                table: "cities".into(),
                data: vec![
                    ("name".into(), "'Madrid'".into()),
                    ("pop".into(), "3300000".into()),
                ],
            }
        );
        // Only the first '=' splits
        assert_eq!(
            command(&["update-row", "cities", "7", "note='a=b'"]),
            Command::UpdateRow {
                table: "cities".into(),
                id: 7,
                data: vec![("note".into(), "'a=b'".into())],
            }
        );
        assert!(parse(&args(&["insert-row", "cities"])).is_err());
        assert!(parse(&args(&["insert-row", "cities", "novalue"])).is_err());
        assert!(parse(&args(&["insert-row", "cities", "=1"])).is_err());
    }

    #[test]
    fn row_ids_must_be_numeric() {
        assert_eq!(
            command(&["delete-row", "cities", "42"]),
            Command::DeleteRow {
                table: "cities".into(),
                id: 42,
            }
        );
        assert!(parse(&args(&["row", "cities", "-1"])).is_err());
        assert!(parse(&args(&["delete-row", "cities", "abc"])).is_err());
    }
}
