//! Writes the API's TypeScript declarations to `shared/types.ts`.
//!
//! Run with `cargo run --bin generate-types` (add `-- --check` to verify the
//! committed file is current).

use std::{env, fs, path::Path};

use anyhow::{Context, bail};
use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `generate-types`. Do not edit it by hand.\n\n";
    let decls = [
        utils::response::ApiResponse::<()>::decl(),
        db::models::client::Client::decl(),
        db::models::client::CreateClient::decl(),
        db::models::client::UpdateClient::decl(),
        db::models::followup::FollowupStatus::decl(),
        db::models::followup::SendOption::decl(),
        db::models::followup::DisplayStatus::decl(),
        db::models::followup::Followup::decl(),
        db::models::followup::FollowupWithClient::decl(),
        db::models::followup::FollowupView::decl(),
        db::models::followup::CreateFollowup::decl(),
        db::models::followup::UpdateFollowup::decl(),
        db::models::profile::Profile::decl(),
        db::models::profile::UpsertProfile::decl(),
        services::services::delivery::OutgoingEmail::decl(),
        services::services::delivery::DeliveryReceipt::decl(),
        services::services::email_generator::GenerateEmailRequest::decl(),
        services::services::email_generator::GeneratedEmail::decl(),
        services::services::analytics::MonthlyActivity::decl(),
        services::services::analytics::CountChange::decl(),
        services::services::analytics::RateChange::decl(),
        services::services::analytics::DashboardStats::decl(),
        services::services::analytics::Dashboard::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| format!("export {}", d.trim_start_matches("export ")))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{header}{body}\n")
}

fn main() -> anyhow::Result<()> {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path)
            .with_context(|| format!("reading {}", types_path.display()))?;
        if current != generated {
            bail!("shared/types.ts is out of date; run `cargo run --bin generate-types`");
        }
        println!("shared/types.ts is up to date");
        return Ok(());
    }

    fs::create_dir_all(&shared_path)?;
    fs::write(&types_path, generated)?;
    println!("Wrote {}", types_path.display());
    Ok(())
}
