use super::timeline::TimelineEditor;

const LABEL_WIDTH: usize = 24;

/// Draw the editor as fixed-width text: an hour ruler, then one row per task
/// with its block positioned along `columns` characters.
pub fn render_text(editor: &TimelineEditor, columns: usize) -> String {
    let columns = columns.max(10);
    let mut out = String::new();

    let mut ruler = vec![' '; columns + 6];
    for tick in editor.hour_ticks() {
        let col = (tick.position * columns as f64).round() as usize;
        let label = format!("{:02}", tick.time.hour());
        for (i, ch) in label.chars().enumerate() {
            if let Some(slot) = ruler.get_mut(col + i) {
                *slot = ch;
            }
        }
    }
    out.push_str(&" ".repeat(LABEL_WIDTH + 1));
    out.push_str(ruler.iter().collect::<String>().trim_end());
    out.push('\n');

    let blocks = editor.blocks();
    if blocks.is_empty() {
        out.push_str("(no tasks scheduled)\n");
        return out;
    }
    for block in blocks {
        let start = (block.left * columns as f64).round() as usize;
        let width = ((block.width * columns as f64).round() as usize).max(1);
        let end = (start + width).min(columns);
        let fill = if block.selected { '#' } else { '=' };

        let mut row = String::with_capacity(columns);
        row.push_str(&" ".repeat(start.min(columns)));
        row.push_str(&fill.to_string().repeat(end.saturating_sub(start)));

        let mut label: String = block.display_name.chars().take(LABEL_WIDTH).collect();
        while label.chars().count() < LABEL_WIDTH {
            label.push(' ');
        }
        out.push_str(&format!(
            "{} |{:<columns$}| {}-{} ({} min) [{}]\n",
            label, row, block.start, block.end, block.duration_minutes, block.task_id,
        ));
    }
    out
}
