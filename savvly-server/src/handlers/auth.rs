use savvly_common::db::{DaoError, DataStore, UserStore};
use savvly_common::messages::{AuthOutput, CredentialPair, RegisterInput, UserOutput};
use savvly_common::models::user::User;
use savvly_common::token::auth_token::AuthToken;
use savvly_common::validators::Validity;

use actix_web::{web, HttpResponse};
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::env;
use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};

// Verified against when the email is unknown so that sign-in takes the same time either way
const DUMMY_PASSWORD: &str = "not-the-password";

pub async fn register(
    data_store: web::Data<DataStore>,
    user_data: web::Json<RegisterInput>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = user_data.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(Cow::Owned(msg)));
    }

    let user_data = user_data.into_inner();
    let email = user_data.email.trim().to_lowercase();

    match data_store.get_user_by_email(&email).await {
        Ok(_) => {
            return Err(HttpErrorResponse::ConflictWithExisting(Cow::Borrowed(
                "Email already registered",
            )));
        }
        Err(e) if e.is_not_found() => (),
        Err(e) => return Err(HttpErrorResponse::from_dao(e, DoesNotExistType::User)),
    }

    let password = Arc::new(user_data.password);
    let password_hash = hash_password(password).await?;

    let user = match data_store
        .create_user(user_data.name.trim(), &email, &password_hash)
        .await
    {
        Ok(u) => u,
        Err(DaoError::AlreadyExists) => {
            return Err(HttpErrorResponse::ConflictWithExisting(Cow::Borrowed(
                "Email already registered",
            )));
        }
        Err(e) => return Err(HttpErrorResponse::from_dao(e, DoesNotExistType::User)),
    };

    log::info!("Registered user {}", user.id);

    Ok(HttpResponse::Created().json(auth_output(&user)?))
}

pub async fn sign_in(
    data_store: web::Data<DataStore>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let credentials = credentials.into_inner();
    let email = credentials.email.trim().to_lowercase();

    let user = match data_store.get_user_by_email(&email).await {
        Ok(u) => Some(u),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(HttpErrorResponse::from_dao(e, DoesNotExistType::User)),
    };

    let stored_hash = match &user {
        Some(u) => u.password_hash.clone(),
        None => dummy_hash().await?,
    };

    let does_password_match_hash = verify_password(credentials.password, stored_hash).await?;

    match user {
        Some(user) if does_password_match_hash => Ok(HttpResponse::Ok().json(auth_output(&user)?)),
        _ => Err(HttpErrorResponse::IncorrectCredential(Cow::Borrowed(
            "Invalid credentials",
        ))),
    }
}

fn auth_output(user: &User) -> Result<AuthOutput, HttpErrorResponse> {
    let token = AuthToken::sign_new(
        user.id,
        &user.email,
        env::CONF.access_token_lifetime,
        &env::CONF.token_signing_key,
    )
    .map_err(|e| {
        log::error!("Failed to sign access token: {e}");
        HttpErrorResponse::InternalError(Cow::Borrowed("Failed to create access token"))
    })?;

    Ok(AuthOutput {
        user: UserOutput::from(user),
        token,
    })
}

async fn hash_password(password: Arc<String>) -> Result<String, HttpErrorResponse> {
    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash_result = argon2_kdf::Hasher::default()
            .algorithm(argon2_kdf::Algorithm::Argon2id)
            .salt_length(env::CONF.hash_salt_length)
            .hash_length(env::CONF.hash_length)
            .iterations(env::CONF.hash_iterations)
            .memory_cost_kib(env::CONF.hash_mem_cost_kib)
            .threads(env::CONF.hash_threads)
            .secret(argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key))
            .hash(password.as_bytes());

        // The receiver only goes away if the request was dropped
        let _ = sender.send(hash_result.map(|h| h.to_string()));
    });

    match receiver.await? {
        Ok(hash) => Ok(hash),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to hash password",
            )))
        }
    }
}

async fn dummy_hash() -> Result<String, HttpErrorResponse> {
    hash_password(Arc::new(String::from(DUMMY_PASSWORD))).await
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool, HttpErrorResponse> {
    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let result = argon2_kdf::Hash::from_str(&stored_hash).map(|hash| {
            hash.verify_with_secret(
                password.as_bytes(),
                argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key),
            )
        });

        let _ = sender.send(result);
    });

    match receiver.await? {
        Ok(matches) => Ok(matches),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to validate password",
            )))
        }
    }
}
