use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePerson {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePerson {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Default)]
pub struct Store {
    next_id: u64,
    people: BTreeMap<u64, Person>,
}

pub type Db = Arc<RwLock<Store>>;

fn people_routes() -> Router<Db> {
    Router::new()
        .route("/people", get(list_people).post(create_person))
        .route(
            "/people/{id}",
            get(get_person).patch(update_person).delete(delete_person),
        )
        .route("/people/{id}/formatted_address", get(formatted_address))
}

/// The people API, served both unversioned and under `/v2`.
pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .merge(people_routes())
        .nest("/v2", people_routes())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app()).await
}

async fn list_people(State(db): State<Db>) -> Json<Vec<Person>> {
    let store = db.read().await;
    Json(store.people.values().cloned().collect())
}

async fn create_person(
    State(db): State<Db>,
    Json(input): Json<CreatePerson>,
) -> (StatusCode, Json<Person>) {
    let mut store = db.write().await;
    store.next_id += 1;
    let person = Person {
        id: store.next_id,
        name: input.name,
        address: input.address,
    };
    store.people.insert(person.id, person.clone());
    debug!(id = person.id, "created person");
    (StatusCode::CREATED, Json(person))
}

async fn get_person(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Person>, StatusCode> {
    let store = db.read().await;
    store.people.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_person(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UpdatePerson>,
) -> Result<Json<Person>, StatusCode> {
    let mut store = db.write().await;
    let person = store.people.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        person.name = name;
    }
    if let Some(address) = input.address {
        person.address = Some(address);
    }
    Ok(Json(person.clone()))
}

async fn delete_person(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    store
        .people
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Plain-text address, upper-cased, so clients see a non-JSON body.
async fn formatted_address(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<String, StatusCode> {
    let store = db.read().await;
    store
        .people
        .get(&id)
        .and_then(|person| person.address.as_deref())
        .map(str::to_uppercase)
        .ok_or(StatusCode::NOT_FOUND)
}
