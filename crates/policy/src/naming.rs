use crate::NameParams;

/// `Title SxxEyy` for episodes, `Title (Year)` otherwise.
pub fn beyondhd_name(params: &NameParams) -> String {
    if params.is_episode() {
        format!("{} S{:02}E{:02}", params.title, params.season, params.episode)
    } else {
        format!("{} ({})", params.title, params.year)
    }
}

pub fn baseline_name(params: &NameParams) -> String {
    params.title.clone()
}
