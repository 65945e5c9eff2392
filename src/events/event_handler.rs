/// Implemented by presentation collaborators (renderers, input adapters)
/// that react to engine events.
pub trait EventHandler<T> {
    fn handle_event(&mut self, event: &T);
}
