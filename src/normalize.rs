//! Canonical text form used for all matching.
//!
//! Card text and queries never compare raw: both sides pass through
//! [`normalize`] first. The pass order is fixed — script conversion, then
//! case folding, then trim — so the substitution table never needs
//! case-duplicated entries.

use std::collections::HashMap;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Application-specific equivalences layered over the script mapping:
/// homophone and colloquial variants that show up in quote text.
const OVERRIDES: &[(char, char)] = &[('你', '妳'), ('啊', '阿')];

/// Common simplified→traditional pairs as they occur in dialogue text.
/// Character-level, not contextual: both card text and queries get the same
/// treatment, so consistency is what matters for containment.
const SIMPLIFIED_TO_TRADITIONAL: &[(char, char)] = &[
  ('爱', '愛'), ('们', '們'), ('见', '見'), ('说', '說'), ('话', '話'), ('对', '對'),
  ('时', '時'), ('间', '間'), ('问', '問'), ('这', '這'), ('么', '麼'), ('还', '還'),
  ('来', '來'), ('没', '沒'), ('听', '聽'), ('写', '寫'), ('读', '讀'), ('书', '書'),
  ('学', '學'), ('会', '會'), ('为', '為'), ('东', '東'), ('买', '買'), ('卖', '賣'),
  ('开', '開'), ('关', '關'), ('门', '門'), ('车', '車'), ('马', '馬'), ('鸟', '鳥'),
  ('鱼', '魚'), ('乐', '樂'), ('药', '藥'), ('医', '醫'), ('难', '難'), ('欢', '歡'),
  ('语', '語'), ('谁', '誰'), ('请', '請'), ('谢', '謝'), ('让', '讓'), ('认', '認'),
  ('识', '識'), ('记', '記'), ('论', '論'), ('讲', '講'), ('计', '計'), ('试', '試'),
  ('变', '變'), ('边', '邊'), ('过', '過'), ('达', '達'), ('运', '運'), ('远', '遠'),
  ('进', '進'), ('连', '連'), ('迟', '遲'), ('选', '選'), ('适', '適'), ('钱', '錢'),
  ('错', '錯'), ('长', '長'), ('风', '風'), ('飞', '飛'), ('养', '養'), ('头', '頭'),
  ('题', '題'), ('体', '體'), ('义', '義'), ('习', '習'), ('后', '後'), ('发', '發'),
  ('当', '當'), ('众', '眾'), ('优', '優'), ('传', '傳'), ('伤', '傷'), ('个', '個'),
  ('别', '別'), ('点', '點'), ('热', '熱'), ('烦', '煩'), ('无', '無'), ('旧', '舊'),
  ('术', '術'), ('机', '機'), ('条', '條'), ('样', '樣'), ('梦', '夢'), ('业', '業'),
  ('岁', '歲'), ('历', '歷'), ('归', '歸'), ('气', '氣'), ('汉', '漢'), ('满', '滿'),
  ('灯', '燈'), ('现', '現'), ('电', '電'), ('画', '畫'), ('疯', '瘋'), ('笔', '筆'),
  ('简', '簡'), ('类', '類'), ('红', '紅'), ('纸', '紙'), ('终', '終'), ('结', '結'),
  ('给', '給'), ('统', '統'), ('继', '繼'), ('续', '續'), ('绿', '綠'), ('网', '網'),
  ('职', '職'), ('联', '聯'), ('脑', '腦'), ('脸', '臉'), ('兴', '興'), ('节', '節'),
  ('蓝', '藍'), ('虽', '雖'), ('装', '裝'), ('里', '裡'), ('觉', '覺'), ('观', '觀'),
  ('视', '視'), ('谈', '談'), ('负', '負'), ('责', '責'), ('质', '質'), ('轻', '輕'),
  ('办', '辦'), ('动', '動'), ('劳', '勞'), ('胜', '勝'), ('区', '區'), ('华', '華'),
  ('单', '單'), ('压', '壓'), ('双', '雙'), ('号', '號'), ('吗', '嗎'), ('员', '員'),
  ('响', '響'), ('团', '團'), ('园', '園'), ('国', '國'), ('图', '圖'), ('场', '場'),
  ('坏', '壞'), ('块', '塊'), ('声', '聲'), ('处', '處'), ('备', '備'), ('复', '復'),
  ('够', '夠'), ('妈', '媽'), ('孙', '孫'), ('宝', '寶'), ('实', '實'), ('审', '審'),
  ('寻', '尋'), ('导', '導'), ('将', '將'), ('尽', '盡'), ('层', '層'), ('岛', '島'),
  ('师', '師'), ('带', '帶'), ('帮', '幫'), ('干', '幹'), ('广', '廣'), ('庆', '慶'),
  ('应', '應'), ('库', '庫'), ('弃', '棄'), ('张', '張'), ('弹', '彈'), ('强', '強'),
  ('忆', '憶'), ('忧', '憂'), ('怀', '懷'), ('态', '態'), ('总', '總'), ('恋', '戀'),
  ('恶', '惡'), ('惊', '驚'), ('惯', '慣'), ('愿', '願'), ('战', '戰'), ('戏', '戲'),
  ('护', '護'), ('报', '報'), ('担', '擔'), ('择', '擇'), ('换', '換'), ('数', '數'),
  ('断', '斷'), ('显', '顯'), ('晓', '曉'), ('泪', '淚'), ('洁', '潔'), ('涌', '湧'),
  ('温', '溫'), ('湿', '濕'), ('炼', '煉'), ('烧', '燒'), ('爷', '爺'), ('狮', '獅'),
  ('独', '獨'), ('猫', '貓'), ('玛', '瑪'), ('环', '環'), ('瞒', '瞞'), ('确', '確'),
  ('祸', '禍'), ('离', '離'), ('种', '種'), ('积', '積'), ('称', '稱'), ('竞', '競'),
  ('级', '級'), ('练', '練'), ('绝', '絕'), ('绑', '綁'), ('维', '維'), ('绪', '緒'),
  ('罚', '罰'), ('肃', '肅'), ('胆', '膽'), ('临', '臨'), ('举', '舉'), ('乌', '烏'),
  ('乡', '鄉'), ('价', '價'),
];

static VARIANTS: LazyLock<HashMap<char, char>> = LazyLock::new(|| {
  let mut table = HashMap::new();
  for &(from, to) in OVERRIDES {
    table.insert(from, to);
  }
  for &(from, to) in SIMPLIFIED_TO_TRADITIONAL {
    // Overrides win over the general mapping.
    table.entry(from).or_insert(to);
  }
  // Invariant: no mapped-to character is itself a key. This is what makes
  // `normalize` idempotent — a second pass finds nothing left to convert.
  debug_assert!(table.values().all(|to| !table.contains_key(to)));
  table
});

/// Canonicalize text for comparison: script conversion, NFKC + lowercase
/// fold, trim. Pure and idempotent.
pub fn normalize(text: &str) -> String {
  let converted: String = text.chars().map(|c| VARIANTS.get(&c).copied().unwrap_or(c)).collect();
  let folded: String = converted.nfkc().collect::<String>().to_lowercase();
  folded.trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- substitutions ---

  #[test]
  fn override_pairs_map() {
    assert_eq!(normalize("你"), "妳");
    assert_eq!(normalize("啊"), "阿");
    assert_eq!(normalize("你們啊"), "妳們阿");
  }

  #[test]
  fn simplified_maps_to_traditional() {
    assert_eq!(normalize("为什么"), "為什麼");
    assert_eq!(normalize("我爱你"), "我愛妳");
  }

  #[test]
  fn traditional_passes_through() {
    assert_eq!(normalize("春日影"), "春日影");
    assert_eq!(normalize("為什麼"), "為什麼");
  }

  // --- folding and trimming ---

  #[test]
  fn case_folded_and_trimmed() {
    assert_eq!(normalize("  CRYCHIC  "), "crychic");
  }

  #[test]
  fn fullwidth_latin_folds() {
    // NFKC maps full-width forms onto ASCII before lowercasing.
    assert_eq!(normalize("ＭｙＧＯ"), "mygo");
  }

  #[test]
  fn empty_and_whitespace() {
    assert_eq!(normalize(""), "");
    assert_eq!(normalize("   "), "");
  }

  // --- idempotence ---

  #[test]
  fn normalize_is_idempotent() {
    let samples = [
      "",
      "   ",
      "你好啊",
      "为什么要演奏春日影",
      "  ＭｙＧＯ!!!!! 第３話  ",
      "Ave Mujica",
      "一輩子 一起組樂團吧",
      "迷子でもいい、前へ進め",
      "ſŧİß mixed ＡＳＣＩＩ 你们",
    ];
    for s in samples {
      let once = normalize(s);
      assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
    }
  }

  #[test]
  fn table_outputs_are_never_keys() {
    for to in VARIANTS.values() {
      assert!(!VARIANTS.contains_key(to), "{to} is both an output and a key");
    }
  }
}
