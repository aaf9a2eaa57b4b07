use tracing::trace;

use super::RendererInner;
use crate::component::ComponentInstance;
use crate::hash::FastHashMap;
use crate::host::{Host, HostNode};
use crate::sequence::get_sequence;
use crate::vnode::{Children, VNode, VNodeKey, is_same_vnode};

impl<H: Host + 'static> RendererInner<H> {
    pub(crate) fn mount_children(
        &self,
        children: &[VNode],
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        for child in children {
            self.patch(None, child, container, anchor, parent);
        }
    }

    pub(crate) fn unmount_children(
        &self,
        children: &[VNode],
        parent: Option<&ComponentInstance>,
        do_remove: bool,
    ) {
        for child in children {
            self.unmount(child, parent, do_remove);
        }
    }

    /// Diff the children of two same-node vnodes rendered into `container`.
    pub(crate) fn patch_children(
        &self,
        old: &VNode,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        match (old.children(), new.children()) {
            (previous, Children::Text(next)) => {
                if let Children::List(previous) = previous {
                    self.unmount_children(previous, parent, true);
                }
                if previous.as_text() != Some(&**next) {
                    self.host.set_element_text(container, next);
                }
            }
            (Children::List(previous), Children::List(next)) => {
                self.patch_keyed_children(previous, next, container, anchor, parent);
            }
            (Children::List(previous), _) => self.unmount_children(previous, parent, true),
            (Children::Text(_), Children::List(next)) => {
                self.host.set_element_text(container, "");
                self.mount_children(next, container, anchor, parent);
            }
            (Children::Text(_), _) => self.host.set_element_text(container, ""),
            (_, Children::List(next)) => self.mount_children(next, container, anchor, parent),
            _ => {}
        }
    }

    /// Keyed list diff: sync the common prefix and suffix, then mount,
    /// unmount, or (in the general case) match by key and move only the
    /// nodes outside the longest increasing subsequence.
    fn patch_keyed_children(
        &self,
        c1: &[VNode],
        c2: &[VNode],
        container: HostNode,
        parent_anchor: Option<HostNode>,
        parent: Option<&ComponentInstance>,
    ) {
        let mut i = 0;
        // Exclusive ends.
        let mut e1 = c1.len();
        let mut e2 = c2.len();

        while i < e1 && i < e2 && is_same_vnode(&c1[i], &c2[i]) {
            self.patch(Some(&c1[i]), &c2[i], container, None, parent);
            i += 1;
        }

        while i < e1 && i < e2 && is_same_vnode(&c1[e1 - 1], &c2[e2 - 1]) {
            self.patch(Some(&c1[e1 - 1]), &c2[e2 - 1], container, None, parent);
            e1 -= 1;
            e2 -= 1;
        }

        if i >= e1 {
            if i < e2 {
                trace!(from = i, to = e2, "keyed diff: mounting remainder");
                let anchor = c2.get(e2).and_then(VNode::el).or(parent_anchor);
                for child in &c2[i..e2] {
                    self.patch(None, child, container, anchor, parent);
                }
            }
            return;
        }

        if i >= e2 {
            trace!(from = i, to = e1, "keyed diff: unmounting remainder");
            self.unmount_children(&c1[i..e1], parent, true);
            return;
        }

        cov_mark::hit!(keyed_diff_general_case);
        trace!(old = ?(i..e1), new = ?(i..e2), "keyed diff: general case");
        let (s1, s2) = (i, i);

        let mut key_to_new_index: FastHashMap<VNodeKey, usize> = FastHashMap::default();
        for (index, child) in c2.iter().enumerate().take(e2).skip(s2) {
            if let Some(key) = child.key() {
                key_to_new_index.insert(key.clone(), index);
            }
        }

        let to_be_patched = e2 - s2;
        let mut patched = 0;
        let mut moved = false;
        let mut max_new_index_so_far = 0;
        // Old index + 1 for each new position; 0 means "mount fresh".
        let mut new_index_to_old_index = vec![0usize; to_be_patched];

        for (old_index, previous) in c1.iter().enumerate().take(e1).skip(s1) {
            if patched >= to_be_patched {
                self.unmount(previous, parent, true);
                continue;
            }
            let new_index = match previous.key() {
                Some(key) => key_to_new_index.get(key).copied(),
                None => (s2..e2).find(|&candidate| {
                    new_index_to_old_index[candidate - s2] == 0
                        && c2[candidate].key().is_none()
                        && is_same_vnode(previous, &c2[candidate])
                }),
            };
            let Some(new_index) = new_index else {
                self.unmount(previous, parent, true);
                continue;
            };
            new_index_to_old_index[new_index - s2] = old_index + 1;
            if new_index >= max_new_index_so_far {
                max_new_index_so_far = new_index;
            } else {
                moved = true;
            }
            self.patch(Some(previous), &c2[new_index], container, None, parent);
            patched += 1;
        }

        let stable = if moved {
            get_sequence(&new_index_to_old_index)
        } else {
            Vec::new()
        };
        let mut remaining = stable.len();
        for offset in (0..to_be_patched).rev() {
            let index = s2 + offset;
            let child = &c2[index];
            let anchor = c2.get(index + 1).and_then(VNode::el).or(parent_anchor);
            if new_index_to_old_index[offset] == 0 {
                self.patch(None, child, container, anchor, parent);
            } else if moved {
                if remaining > 0 && stable[remaining - 1] == offset {
                    remaining -= 1;
                } else {
                    self.move_vnode(child, container, anchor);
                }
            }
        }
    }
}
