/// A form submission as seen by the controller.
///
/// The default action (navigating away with the form data) is only skipped
/// when a handler calls [`SubmitEvent::prevent_default`].
#[derive(Debug, Default)]
pub struct SubmitEvent {
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}
