pub mod endpoint;
pub mod error;
pub mod inverter;
pub mod mix;
pub mod noah;
pub mod plant;
pub mod response;
pub mod settings;
pub mod tlx;

use crate::model;
pub use error::Error;
use reqwest::RequestBuilder;
use response::login::Login;
use serde_json::Value;

/// Query string or form fields, in the order they are sent.
pub type Params<'a> = Vec<(&'a str, String)>;

pub fn api(username: &str, password: &str) -> model::Api {
    model::Api {
        server_url: model::SERVER_URL.to_string(),
        agent_identifier: model::AGENT_IDENTIFIER.to_string(),
        username: username.to_owned(),
        password: password.to_owned(),
        is_password_hashed: false,
    }
}

/// MD5 hex digest where every byte starting with `0` gets a `c` instead.
pub fn hash_password(password: &str) -> String {
    let digest = format!("{:x}", md5::compute(password.as_bytes()));
    digest
        .chars()
        .enumerate()
        .map(|(i, c)| if i % 2 == 0 && c == '0' { 'c' } else { c })
        .collect()
}

/// Map Non-200 API response to Error
pub(crate) fn map_api_err(error: reqwest::Error) -> Error {
    match error.status() {
        Some(http::StatusCode::TOO_MANY_REQUESTS) => Error::RateExceeded(error.to_string()),
        Some(http::StatusCode::UNAUTHORIZED) | Some(http::StatusCode::FORBIDDEN) => {
            Error::LoginError(error.to_string())
        }
        _ => Error::ApiError(error.to_string()),
    }
}

/// Send `request`, fail on non-2xx status and parse the body as JSON.
pub(crate) async fn send(request: RequestBuilder, endpoint: &str) -> Result<Value, Error> {
    let response_text = request
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(map_api_err)?
        .text()
        .await
        .map_err(|e| Error::ApiError(format!("Error reading API response: {}", e)))?;

    log::trace!("endpoint: {}, response_text: {}", endpoint, response_text);

    serde_json::from_str::<Value>(&response_text)
        .map_err(|e| Error::InvalidResponse(response_text, e.to_string()))
}

async fn get(
    api: &model::LoggedInApi,
    endpoint: &endpoint::Endpoint,
    query: &Params<'_>,
) -> Result<Value, Error> {
    log::debug!("GET {} {:?}", endpoint, query);
    send(api.client.get(api.get_url(endpoint)).query(query), endpoint).await
}

async fn post(
    api: &model::LoggedInApi,
    endpoint: &endpoint::Endpoint,
    query: &Params<'_>,
    form: Option<&Params<'_>>,
) -> Result<Value, Error> {
    log::debug!("POST {} {:?} {:?}", endpoint, query, form);
    let request = api.client.post(api.get_url(endpoint)).query(query);
    let request = match form {
        Some(form) => request.form(form),
        None => request,
    };
    send(request, endpoint).await
}

/// Log in to the ShinePhone API. The session cookie stays in the returned client.
pub async fn login(api: &model::Api) -> Result<model::LoggedInApi, Error> {
    let client = reqwest::ClientBuilder::new()
        .cookie_store(true)
        .user_agent(api.agent_identifier.to_owned())
        .build()
        .or(Err(Error::InternalError))?;
    let url = format!("{}{}", api.server_url, endpoint::LOGIN);

    let password = if api.is_password_hashed {
        api.password.to_owned()
    } else {
        hash_password(&api.password)
    };
    let form = [("userName", api.username.to_owned()), ("password", password)];

    let value = send(client.post(url).form(&form), endpoint::LOGIN).await?;
    let mut back = value
        .get("back")
        .cloned()
        .ok_or(Error::UnexpectedApiResponse)?;
    let login = serde_json::from_value::<Login>(back.clone())
        .map_err(|e| Error::InvalidResponse(back.to_string(), e.to_string()))?;

    match (login.success, &login.user) {
        (true, Some(user)) => {
            if let Some(map) = back.as_object_mut() {
                map.insert("userId".to_string(), Value::from(user.id.to_owned()));
                map.insert("userLevel".to_string(), Value::from(user.rightlevel));
            }
            log::debug!("logged in as user {}", user.id);

            Ok(model::LoggedInApi {
                server_url: api.server_url.to_owned(),
                login: model::LoginResult {
                    user_id: user.id.to_owned(),
                    user_level: user.rightlevel,
                    plants: login.data.clone(),
                    raw: back,
                },
                client,
            })
        }
        (true, None) => Err(Error::LoginError(String::from(
            "login succeeded but no user was returned",
        ))),
        (false, _) => Err(Error::LoginError(login.error_message())),
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn hash_password_replaces_leading_zero_nibbles() {
        // md5("password") = 5f4dcc3b5aa765d61d8327deb882cf99
        assert_eq!("5f4dcc3b5aa765d61d8327deb882cf99", hash_password("password"));
        // md5("abc") = 900150983cd24fb0d6963f7d28e17f72
        assert_eq!("90c150983cd24fb0d6963f7d28e17f72", hash_password("abc"));
    }

    #[tokio::test]
    async fn login_posts_hashed_password() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/newTwoLoginAPI.do")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("userName".into(), "user".into()),
                Matcher::UrlEncoded("password".into(), hash_password("password")),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(testing::read_resource("newTwoLoginAPI.json"))
            .create_async()
            .await;

        let api = api("user", "password").with_server_url(&format!("{}/", server.url()));
        let logged_in = login(&api).await.unwrap();

        mock.assert_async().await;
        assert_eq!("123456", logged_in.user_id());
        assert_eq!(Some(1), logged_in.login.user_level);
        assert_eq!("123456", logged_in.login.raw["userId"]);
        assert_eq!("My Plant", logged_in.login.plants[0].name);
    }

    #[tokio::test]
    async fn login_keeps_prehashed_password() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/newTwoLoginAPI.do")
            .match_query(Matcher::Any)
            .match_body(Matcher::UrlEncoded("password".into(), "c1a2b3".into()))
            .with_body(testing::read_resource("newTwoLoginAPI.json"))
            .create_async()
            .await;

        let mut api = api("user", "c1a2b3").with_server_url(&format!("{}/", server.url()));
        api.is_password_hashed = true;
        login(&api).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn login_failure_is_login_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/newTwoLoginAPI.do")
            .match_query(Matcher::Any)
            .with_body(r#"{"back":{"success":false,"msg":"501","error":"User Does Not Exist"}}"#)
            .create_async()
            .await;

        let api = api("user", "password").with_server_url(&format!("{}/", server.url()));
        match login(&api).await {
            Err(Error::LoginError(msg)) => assert_eq!("User Does Not Exist", msg),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_errors_are_mapped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/newTlxApi.do")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;
        server
            .mock("GET", "/newMixApi.do")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        assert!(matches!(
            tlx::tlx_detail(&api, "TLX1").await,
            Err(Error::RateExceeded(_))
        ));
        assert!(matches!(
            mix::mix_info(&api, "MIX1", None).await,
            Err(Error::ApiError(_))
        ));
    }

    #[tokio::test]
    async fn non_json_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/newInverterAPI.do")
            .match_query(Matcher::Any)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let api = testing::logged_in(&server);
        match inverter::inverter_detail(&api, "INV1").await {
            Err(Error::InvalidResponse(body, _)) => assert_eq!("<html>maintenance</html>", body),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
