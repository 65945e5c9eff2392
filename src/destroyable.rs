// implemented by types holding subscriptions that must be released explicitly
pub trait Destroyable {
    fn destroy(&mut self);
}
