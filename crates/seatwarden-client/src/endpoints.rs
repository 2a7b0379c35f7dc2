/// URL builders for the library service, rooted at a configurable base.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Profile page; carries the user's nickname.
    pub fn center(&self) -> String {
        format!("{}/index.php/center.html", self.base)
    }

    /// Reservation overview; carries the state markers and check-in deadline.
    pub fn reserve_index(&self) -> String {
        format!("{}/index.php/reserve/index.html", self.base)
    }

    /// Seat grid used to resolve seat numbers to seat ids.
    pub fn seat_layout(&self, room_id: &str) -> String {
        format!(
            "{}/index.php/reserve/layoutApi/action=settings_seat_cls&libid={}.html",
            self.base, room_id
        )
    }

    /// Room page whose script references include the reservation script.
    pub fn room_layout(&self, room_id: &str) -> String {
        format!("{}/index.php/reserve/layout/libid={}.html", self.base, room_id)
    }

    /// Exposed to service scripts as `AJAX_URL`.
    pub fn ajax(&self) -> String {
        format!("{}/index.php/reserve/get/", self.base)
    }

    pub fn cancel_token(&self) -> String {
        format!("{}/index.php/reserve/token.html", self.base)
    }

    pub fn cancel_confirm(&self, token: &str) -> String {
        format!("{}/index.php/cancle/index?t={}", self.base, token)
    }
}
