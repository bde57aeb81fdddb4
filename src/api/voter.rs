use mongodb::{bson::doc, options::FindOptions, Client};
use rand::thread_rng;
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::AdminKey,
        voter::{parse_import_line, ImportSummary, VoterDescription},
    },
    common::{KeyCode, VoterId},
    db::{
        vote::Vote,
        voter::{voter_by_key_code, Voter},
    },
    mongodb::{is_duplicate_key_error, u32_id_filter, Coll, Counter, VOTER_ID_COUNTER},
};

pub fn routes() -> Vec<Route> {
    routes![
        import_voters,
        add_voter,
        get_voters,
        delete_voter,
        clear_voters,
        generate_key_code,
    ]
}

/// Bulk-import voters from a line-oriented `name,keycode` body. Blank lines
/// are ignored; malformed lines and duplicate key codes are counted as
/// skipped rather than failing the whole import.
#[post("/voters/import", data = "<source>")]
async fn import_voters(
    _key: AdminKey,
    source: String,
    voters: Coll<Voter>,
    counters: Coll<Counter>,
) -> Result<Json<ImportSummary>> {
    let mut imported = 0;
    let mut skipped = 0;

    for line in source.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, key_code)) = parse_import_line(line) else {
            skipped += 1;
            continue;
        };

        let voter_id = Counter::next(&counters, VOTER_ID_COUNTER).await?;
        let voter = Voter::new(voter_id, name, key_code);
        match voters.insert_one(&voter, None).await {
            Ok(_) => imported += 1,
            Err(err) if is_duplicate_key_error(&err) => skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }

    info!("Imported {imported} voters ({skipped} skipped)");
    Ok(Json(ImportSummary { imported, skipped }))
}

#[post("/voters", data = "<request>", format = "json")]
async fn add_voter(
    _key: AdminKey,
    request: Json<AddVoterRequest>,
    voters: Coll<Voter>,
    counters: Coll<Counter>,
) -> Result<Json<VoterDescription>> {
    let name = request.0.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("Voter name must not be blank"));
    }
    let key_code = KeyCode::try_from(request.0.key_code)?;

    let voter_id = Counter::next(&counters, VOTER_ID_COUNTER).await?;
    let voter = Voter::new(voter_id, name, key_code);
    // The unique index on `key_code` is the source of truth for collisions.
    match voters.insert_one(&voter, None).await {
        Ok(_) => {}
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::conflict("Key code already exists"));
        }
        Err(err) => return Err(err.into()),
    }

    info!("Registered voter {voter_id} '{}'", voter.name);
    Ok(Json(voter.into()))
}

#[get("/voters")]
async fn get_voters(_key: AdminKey, voters: Coll<Voter>) -> Result<Json<Vec<VoterDescription>>> {
    let options = FindOptions::builder().sort(doc! {"name": 1}).build();
    let all = voters
        .find(None, options)
        .await?
        .try_collect::<Vec<_>>()
        .await?;
    Ok(Json(all.into_iter().map(Into::into).collect()))
}

/// Remove a voter and their votes together.
#[delete("/voters/<voter_id>")]
async fn delete_voter(
    _key: AdminKey,
    voter_id: VoterId,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
    db_client: &State<Client>,
) -> Result<()> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = voters
        .delete_one_with_session(u32_id_filter(voter_id), None, &mut session)
        .await?;
    if result.deleted_count == 0 {
        return Err(Error::Status(
            Status::BadRequest,
            format!("No voter with ID '{voter_id}'"),
        ));
    }
    votes
        .delete_many_with_session(doc! {"voter_id": voter_id as i64}, None, &mut session)
        .await?;

    session.commit_transaction().await?;
    info!("Deleted voter {voter_id}");
    Ok(())
}

/// Remove all voters and all votes.
#[delete("/voters")]
async fn clear_voters(
    _key: AdminKey,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
    db_client: &State<Client>,
) -> Result<Json<ClearSummary>> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = voters
        .delete_many_with_session(doc! {}, None, &mut session)
        .await?;
    votes
        .delete_many_with_session(doc! {}, None, &mut session)
        .await?;

    session.commit_transaction().await?;
    info!("Cleared {} voters", result.deleted_count);
    Ok(Json(ClearSummary {
        deleted: result.deleted_count,
    }))
}

/// Suggest a fresh key code that no registered voter currently holds.
#[get("/voters/generate-keycode")]
async fn generate_key_code(
    _key: AdminKey,
    voters: Coll<Voter>,
) -> Result<Json<GeneratedKeyCode>> {
    loop {
        // Scoped so the RNG is dropped before the await.
        let candidate = {
            let mut rng = thread_rng();
            KeyCode::random(&mut rng)
        };
        if voter_by_key_code(&voters, &candidate).await?.is_none() {
            return Ok(Json(GeneratedKeyCode {
                key_code: candidate,
            }));
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddVoterRequest {
    name: String,
    key_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClearSummary {
    deleted: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedKeyCode {
    key_code: KeyCode,
}
