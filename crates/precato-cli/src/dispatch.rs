use precato_client::browse::PageRequest;
use precato_client::commands;
use precato_client::{ClientResult, SuccessEnvelope};

use crate::cli::{ClaimsCommand, Cli, Commands, FilterArg, ReferenceCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Claims { command } => match command {
            ClaimsCommand::List {
                page,
                per_page,
                sort,
                order,
                filters,
                reference,
                json: _,
            } => {
                let request = PageRequest {
                    page: *page,
                    per_page: *per_page,
                    sort: sort.clone(),
                    order: order.clone(),
                    filters: filter_pairs(filters),
                };
                commands::claims::list(request, reference.as_deref())
            }
        },
        Commands::Reference { command } => match command {
            ReferenceCommand::Check { reference, .. } => {
                commands::reference::check(reference.as_deref())
            }
            ReferenceCommand::Resolve {
                name, reference, ..
            } => commands::reference::resolve(name, reference.as_deref()),
        },
    }
}

fn filter_pairs(filters: &[FilterArg]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| (filter.field.clone(), filter.value.clone()))
        .collect()
}
