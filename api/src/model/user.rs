use kernel::model::{role::Role, user::UserInfo};
use serde::Serialize;

#[derive(Serialize)]
pub struct UserInfoResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: String,
}

impl From<UserInfo> for UserInfoResponse {
    fn from(value: UserInfo) -> Self {
        let UserInfo {
            id,
            email,
            name,
            picture,
        } = value;
        Self {
            id,
            email,
            name,
            picture,
        }
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user_info: UserInfoResponse,
    pub role: Role,
}

#[derive(Debug, serde::Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
    pub error: Option<String>,
}
