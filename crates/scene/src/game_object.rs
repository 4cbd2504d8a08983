//! Drawable scene objects and their id allocator.

use std::sync::Arc;

use glam::Vec3;
use renderer_resources::Model;

use crate::transform::TransformComponent;

/// Unique identifier of a [`GameObject`].
pub type GameObjectId = u32;

/// An object in the scene: a transform, an optional shared model and a color.
///
/// Objects are created only through a [`GameObjectIdAllocator`] and are not
/// `Clone`, so ids stay unique.
pub struct GameObject {
    id: GameObjectId,
    pub transform: TransformComponent,
    pub model: Option<Arc<Model>>,
    pub color: Vec3,
}

impl GameObject {
    #[inline]
    pub fn id(&self) -> GameObjectId {
        self.id
    }

    pub fn with_model(mut self, model: Arc<Model>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_transform(mut self, transform: TransformComponent) -> Self {
        self.transform = transform;
        self
    }
}

/// Hands out sequential game object ids starting at 0.
#[derive(Debug, Default)]
pub struct GameObjectIdAllocator {
    next_id: GameObjectId,
}

impl GameObjectIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object with the next id, identity transform, no model and
    /// black color.
    pub fn create(&mut self) -> GameObject {
        let id = self.next_id;
        self.next_id += 1;
        GameObject {
            id,
            transform: TransformComponent::default(),
            model: None,
            color: Vec3::ZERO,
        }
    }

    /// Number of ids handed out so far.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut ids = GameObjectIdAllocator::new();
        let a = ids.create();
        let b = ids.create();
        let c = ids.create();
        assert_eq!((a.id(), b.id(), c.id()), (0, 1, 2));
        assert_eq!(ids.allocated(), 3);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut first = GameObjectIdAllocator::new();
        let mut second = GameObjectIdAllocator::new();
        first.create();
        first.create();
        assert_eq!(second.create().id(), 0);
    }

    #[test]
    fn test_new_object_defaults() {
        let object = GameObjectIdAllocator::new().create();
        assert!(object.model.is_none());
        assert_eq!(object.color, Vec3::ZERO);
        assert_eq!(object.transform, TransformComponent::default());
    }
}
