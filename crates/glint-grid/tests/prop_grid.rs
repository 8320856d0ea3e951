use glint_geom::Rgb;
use glint_grid::{Medium, NoNonSolid, NonSolidProbe, TileArea, TileBuf};
use proptest::prelude::*;

fn dim() -> impl Strategy<Value = usize> {
    1usize..=12
}

proptest! {
    // idx maps each (x,y) within bounds to a unique in-range index
    #[test]
    fn idx_is_unique_and_in_range(w in dim(), h in dim()) {
        let area = TileArea::new(w, h);
        let mut seen = vec![false; area.len()];
        for x in 0..w { for y in 0..h {
            let i = area.idx(x, y);
            prop_assert!(i < area.len());
            prop_assert!(!seen[i]);
            seen[i] = true;
        }}
        prop_assert!(seen.into_iter().all(|b| b));
    }

    // coords inverts idx, and the vertical neighbour is one stride away
    #[test]
    fn coords_inverts_idx(w in dim(), h in dim(), ox in -1000i32..1000, oy in -1000i32..1000) {
        let area = TileArea::new(w, h).with_origin(ox, oy);
        for i in 0..area.len() {
            let (x, y) = area.coords(i);
            prop_assert_eq!(area.idx(x, y), i);
            prop_assert_eq!(area.world(x, y), (ox + x as i32, oy + y as i32));
            if y + 1 < h {
                prop_assert_eq!(area.idx(x, y + 1), i + 1);
            }
            if x + 1 < w {
                prop_assert_eq!(area.idx(x + 1, y), i + h);
            }
        }
    }

    // from_media pads short inputs with air and truncates long ones
    #[test]
    fn from_media_resizes(w in dim(), h in dim(), n in 0usize..200) {
        let area = TileArea::new(w, h);
        let buf = TileBuf::from_media(area, vec![Medium::Solid; n]);
        prop_assert_eq!(buf.media.len(), area.len());
        prop_assert_eq!(buf.lights.len(), area.len());
        prop_assert_eq!(buf.count(Medium::Solid), n.min(area.len()));
    }
}

#[test]
fn only_solid_is_opaque() {
    for m in Medium::ALL {
        assert_eq!(m.is_opaque(), m == Medium::Solid);
        assert_eq!(Medium::ALL[m.index()], m);
    }
}

#[test]
fn probes() {
    let column = |wx: i32, _wy: i32| wx == 3;
    assert!(column.is_non_solid(3, 10));
    assert!(!column.is_non_solid(4, 10));
    assert!(!NoNonSolid.is_non_solid(3, 10));
}

#[test]
fn fill_rect_clips() {
    let mut buf = TileBuf::new(TileArea::new(4, 3));
    buf.fill_rect(2, 1, 10, 10, Medium::Water);
    assert_eq!(buf.count(Medium::Water), 2 * 2);
    buf.set_light(0, 0, Rgb::ONE);
    assert_eq!(buf.light(0, 0), Rgb::ONE);
    assert_eq!(buf.medium(3, 2), Medium::Water);
    assert!(TileArea::new(0, 5).is_empty());
}
