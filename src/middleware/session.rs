use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::user::UserSessionData;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// The session carried by the request cookies, if both tokens are present
pub fn read_session(cookies: &Cookies) -> Option<UserSessionData> {
    let access_token = cookies.get(ACCESS_TOKEN_COOKIE)?.value().to_string();
    let refresh_token = cookies.get(REFRESH_TOKEN_COOKIE)?.value().to_string();
    if access_token.is_empty() || refresh_token.is_empty() {
        return None;
    }
    Some(UserSessionData {
        access_token,
        refresh_token,
    })
}

pub fn write_session(cookies: &Cookies, session: &UserSessionData, secure: bool) {
    cookies.add(session_cookie(ACCESS_TOKEN_COOKIE, session.access_token.clone(), secure));
    cookies.add(session_cookie(REFRESH_TOKEN_COOKIE, session.refresh_token.clone(), secure));
}

pub fn remove_session(cookies: &Cookies) {
    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        cookies.remove(Cookie::build((name, "")).path("/").build());
    }
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}
