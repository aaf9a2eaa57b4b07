//! Classification bits carried by every vnode.

use bitflags::bitflags;

bitflags! {
    /// What a vnode is and what shape its children have.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShapeFlags: u16 {
        /// Host element.
        const ELEMENT = 1;
        /// Functional component: a plain render function, no instance state.
        const FUNCTIONAL_COMPONENT = 1 << 1;
        /// Stateful component with setup, data, and a render effect.
        const STATEFUL_COMPONENT = 1 << 2;
        /// Children are a single text string.
        const TEXT_CHILDREN = 1 << 3;
        /// Children are a vnode list.
        const ARRAY_CHILDREN = 1 << 4;
        /// Children are a slot table.
        const SLOTS_CHILDREN = 1 << 5;
        /// Teleport.
        const TELEPORT = 1 << 6;
        /// Unmounting deactivates into the keep-alive storage instead.
        const COMPONENT_SHOULD_KEEP_ALIVE = 1 << 8;
        /// Mounting reactivates a cached instance instead of creating one.
        const COMPONENT_KEPT_ALIVE = 1 << 9;
        /// Either kind of component.
        const COMPONENT = Self::STATEFUL_COMPONENT.bits() | Self::FUNCTIONAL_COMPONENT.bits();
    }
}

bitflags! {
    /// Which parts of an element may differ between renders.
    ///
    /// An empty set means "unknown": the reconciler diffs every prop.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PatchFlags: u16 {
        /// Text children are dynamic.
        const TEXT = 1;
        /// `class` is dynamic.
        const CLASS = 1 << 1;
        /// `style` is dynamic.
        const STYLE = 1 << 2;
        /// The props named in the vnode's dynamic prop list are dynamic.
        const PROPS = 1 << 3;
        /// Keys themselves vary: fall back to a full prop diff.
        const FULL_PROPS = 1 << 4;
    }
}
